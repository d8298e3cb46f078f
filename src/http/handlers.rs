//! Request handlers.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::engine::mcp::SERVER_NAME;
use crate::routing::{MessageRouter, RouteError};
use crate::session::LifecycleManager;
use crate::transport::{EventStream, KEEP_ALIVE_TEXT};

/// Header some clients use instead of the `sessionId` query parameter.
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: LifecycleManager,
    pub router: MessageRouter,
    /// Idle interval between keep-alive comments; `None` disables them.
    pub keep_alive: Option<Duration>,
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "service": SERVER_NAME}))
}

/// `GET /sse` and `POST /sse`: open a session and stream its events.
pub async fn open_stream(State(state): State<AppState>) -> Response {
    let (_session, stream) = state.lifecycle.open();
    event_stream_response(stream, state.keep_alive)
}

/// Wrap a session stream in an SSE response. `Sse` sets the content type
/// and `Cache-Control`; proxies are told not to buffer.
pub fn event_stream_response(stream: EventStream, keep_alive: Option<Duration>) -> Response {
    let headers = [
        (header::CONNECTION, "keep-alive"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];

    match keep_alive {
        Some(interval) => {
            let keep_alive = KeepAlive::new().interval(interval).text(KEEP_ALIVE_TEXT);
            (headers, Sse::new(stream).keep_alive(keep_alive)).into_response()
        }
        None => (headers, Sse::new(stream)).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    #[serde(rename = "connectionId")]
    pub connection_id: Option<String>,
}

impl MessageQuery {
    /// `sessionId`, then `connectionId`, then the connection-id header.
    fn resolve(self, headers: &HeaderMap) -> Option<String> {
        self.session_id
            .filter(|id| !id.is_empty())
            .or(self.connection_id.filter(|id| !id.is_empty()))
            .or_else(|| {
                headers
                    .get(CONNECTION_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            })
    }
}

/// `POST /message`: hand one raw message to its session.
pub async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, RouteError> {
    let session_id = query.resolve(&headers);
    state.router.route(session_id.as_deref(), body).await?;
    Ok(Json(json!({"received": true})))
}
