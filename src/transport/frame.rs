//! Event constructors for the session stream.
//!
//! Wire encoding (field lines, multi-line payload splitting, keep-alive
//! comments) is done by axum's `Sse` response.

use axum::response::sse::Event;

use crate::session::SessionId;
use crate::transport::MESSAGE_PATH;

/// Name of the handshake event that announces the message endpoint.
pub const ENDPOINT_EVENT: &str = "endpoint";

/// Keep-alive comment text.
pub const KEEP_ALIVE_TEXT: &str = "keep-alive";

/// Path a client posts its messages to, e.g. `/message?sessionId=<id>`.
pub fn endpoint_path(session_id: &SessionId) -> String {
    format!("{MESSAGE_PATH}?sessionId={session_id}")
}

/// The handshake event telling a client where to post its messages.
pub fn endpoint_event(session_id: &SessionId) -> Event {
    Event::default()
        .event(ENDPOINT_EVENT)
        .data(endpoint_path(session_id))
}

/// An unnamed event carrying one serialized protocol message.
pub fn message_event(payload: &str) -> Event {
    Event::default().data(payload)
}
