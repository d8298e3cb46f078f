//! Protocol engine subsystem.
//!
//! # Data Flow
//! ```text
//! raw inbound message (one per POST /message)
//!     → jsonrpc.rs (parse, classify request / notification / response)
//!     → mcp.rs (method dispatch)
//!         → tools.rs (tools/list, tools/call)
//!         → resources.rs (resources/list, resources/read)
//!     → serialized replies → session outbound channel
//! ```
//!
//! # Design Decisions
//! - The transport only sees the [`ProtocolEngine`] trait; it never parses
//!   protocol messages itself
//! - One engine instance per session, built by an [`EngineFactory`]
//! - Protocol-level failures are replies, not engine errors

use async_trait::async_trait;
use thiserror::Error;

use crate::session::SessionId;

pub mod jsonrpc;
pub mod mcp;
pub mod resources;
pub mod tools;

pub use mcp::{McpEngine, McpEngineFactory};

/// Failure of the engine itself, as opposed to a protocol error reply.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("internal engine error: {0}")]
    Internal(String),
    #[error("engine panicked while handling a message")]
    Panicked,
}

/// Consumes raw inbound messages for one session and produces replies.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Handle one raw message. Returns zero or more serialized replies, in
    /// the order they must be written to the session's stream.
    async fn handle(&self, raw: &str) -> Result<Vec<String>, EngineError>;
}

/// Builds one engine per session.
pub trait EngineFactory: Send + Sync {
    fn create(&self, session_id: &SessionId) -> Box<dyn ProtocolEngine>;
}
