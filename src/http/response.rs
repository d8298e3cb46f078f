//! Error responses.
//!
//! Routing failures map to fixed statuses with a JSON body carrying an
//! `error` message; an unknown session additionally lists the live ones.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::routing::RouteError;

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSessionId | Self::EmptyBody => StatusCode::BAD_REQUEST,
            Self::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::SessionClosed => StatusCode::GONE,
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::SessionNotFound { known } => json!({
                "error": self.to_string(),
                "sessions": known,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
