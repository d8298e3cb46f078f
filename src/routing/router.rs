//! Inbound message routing.
//!
//! # Responsibilities
//! - Validate the session id and body of a posted message
//! - Resolve the id by exact match
//! - Append the message to the session's inbound queue
//!
//! # Design Decisions
//! - Exact lookup only: no prefix or substring fallback
//! - Draining sessions still accept messages; their replies are dropped
//! - Routing to an unknown id has no side effects on the registry

use thiserror::Error;

use crate::observability::metrics;
use crate::session::{SessionId, SessionRegistry, SessionState};

/// Why a posted message was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Missing sessionId")]
    MissingSessionId,
    #[error("Empty message body")]
    EmptyBody,
    #[error("Session not found")]
    SessionNotFound {
        /// Ids currently registered, never including the requested one.
        known: Vec<SessionId>,
    },
    #[error("Session is closed")]
    SessionClosed,
}

impl RouteError {
    fn outcome(&self) -> &'static str {
        match self {
            Self::MissingSessionId => "missing_id",
            Self::EmptyBody => "empty_body",
            Self::SessionNotFound { .. } => "not_found",
            Self::SessionClosed => "closed",
        }
    }
}

/// Resolves posted messages to sessions.
#[derive(Clone)]
pub struct MessageRouter {
    registry: SessionRegistry,
}

impl MessageRouter {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    /// Hand `raw` to the session named by `session_id`.
    ///
    /// Resolves once the message is queued, before the engine processes it.
    pub async fn route(&self, session_id: Option<&str>, raw: String) -> Result<(), RouteError> {
        let result = self.deliver(session_id, raw).await;
        match &result {
            Ok(()) => metrics::record_message_routed("delivered"),
            Err(err) => metrics::record_message_routed(err.outcome()),
        }
        result
    }

    async fn deliver(&self, session_id: Option<&str>, raw: String) -> Result<(), RouteError> {
        let id = session_id
            .filter(|id| !id.is_empty())
            .ok_or(RouteError::MissingSessionId)?;

        if raw.trim().is_empty() {
            return Err(RouteError::EmptyBody);
        }

        let Some(session) = self.registry.get(id) else {
            let known = self
                .registry
                .ids()
                .into_iter()
                .filter(|known| known.as_str() != id)
                .collect::<Vec<_>>();
            tracing::warn!(session_id = %id, known = known.len(), "Message for unknown session");
            return Err(RouteError::SessionNotFound { known });
        };

        if session.state() == SessionState::Closed {
            return Err(RouteError::SessionClosed);
        }

        session.deliver(raw).await.map_err(|_| RouteError::SessionClosed)?;
        tracing::debug!(session_id = %id, "Message queued");
        Ok(())
    }
}
