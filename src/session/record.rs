//! The session record and its state machine.
//!
//! # States
//! - Active: stream open, messages routed and answered
//! - Draining: stream gone, inbound messages still accepted for the grace interval
//! - Closed: channel closed, about to leave the registry
//!
//! # State Transitions
//! ```text
//! Active   → Draining: transport disconnect
//! Active   → Closed:   explicit teardown (process shutdown)
//! Draining → Closed:   grace interval elapsed
//! ```
//!
//! Transitions are compare-and-swap on a single byte, so concurrent callers
//! agree on exactly one winner per transition.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

use crate::session::SessionId;
use crate::transport::OutboundChannel;

/// Session state for lifecycle tracking.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Stream connected.
    Active = 0,
    /// Stream disconnected, waiting out the grace interval.
    Draining = 1,
    /// Terminal.
    Closed = 2,
}

impl From<u8> for SessionState {
    fn from(val: u8) -> Self {
        match val {
            0 => SessionState::Active,
            1 => SessionState::Draining,
            _ => SessionState::Closed,
        }
    }
}

/// Server-side record binding one outbound stream to one inbound queue.
///
/// The engine is not stored here: it lives in the session's inbound worker
/// task, which exits when the outbound channel closes.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: AtomicU8,
    outbound: OutboundChannel,
    inbound: mpsc::Sender<String>,
    created_at: SystemTime,
}

impl Session {
    pub(crate) fn new(id: SessionId, outbound: OutboundChannel, inbound: mpsc::Sender<String>) -> Self {
        Self {
            id,
            state: AtomicU8::new(SessionState::Active as u8),
            outbound,
            inbound,
            created_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.state.load(Ordering::Acquire))
    }

    pub fn outbound(&self) -> &OutboundChannel {
        &self.outbound
    }

    /// Time since creation, for diagnostics.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed().unwrap_or_default()
    }

    /// Queue a raw inbound message for the engine.
    ///
    /// Fails only when the inbound worker has already stopped.
    pub(crate) async fn deliver(&self, raw: String) -> Result<(), mpsc::error::SendError<String>> {
        self.inbound.send(raw).await
    }

    /// `Active → Draining`. Returns false if the session was not active.
    pub(crate) fn begin_draining(&self) -> bool {
        self.transition(SessionState::Active, SessionState::Draining)
    }

    /// `Active | Draining → Closed`. Returns true for exactly one caller.
    pub(crate) fn mark_closed(&self) -> bool {
        self.transition(SessionState::Active, SessionState::Closed)
            || self.transition(SessionState::Draining, SessionState::Closed)
    }

    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
