//! Concurrent session registry.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::session::{Session, SessionId};

/// Map of live sessions, shared by the stream and message handlers.
///
/// Handles are reference counted: a lookup that races with removal keeps a
/// usable record until the caller drops it, and observes its `Closed` state.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under a freshly generated, unused identifier.
    ///
    /// `build` runs while the identifier's slot is reserved, so two concurrent
    /// calls can never end up sharing an identifier. Anything else `build`
    /// produces alongside the session is handed back to the caller.
    pub fn create<F, T>(&self, build: F) -> (Arc<Session>, T)
    where
        F: FnOnce(SessionId) -> (Session, T),
    {
        let slot = loop {
            let id = SessionId::generate();
            match self.sessions.entry(id) {
                Entry::Vacant(slot) => break slot,
                Entry::Occupied(taken) => {
                    tracing::warn!(session_id = %taken.key(), "Session id collision, regenerating");
                }
            }
        };

        let (session, extra) = build(slot.key().clone());
        let session = Arc::new(session);
        slot.insert(session.clone());
        (session, extra)
    }

    /// Exact-match lookup.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session. Removing an absent id is a no-op.
    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    /// Snapshot of current identifiers, for diagnostics.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
