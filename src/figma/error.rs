//! Figma client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FigmaError {
    #[error("FIGMA_ACCESS_TOKEN is required")]
    MissingToken,

    #[error("invalid Figma API base URL: {0}")]
    InvalidBaseUrl(String),

    /// Non-2xx response; `message` is the response body, or the status
    /// reason when the body is empty.
    #[error("Figma API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Figma request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected Figma response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FigmaError {
    /// Rate limiting, server-side failures and transport hiccups are worth
    /// another attempt; everything else fails the same way twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}
