//! Figma REST API collaborator.
//!
//! # Responsibilities
//! - Authenticated GETs against the REST API (`X-Figma-Token`)
//! - Retry of rate-limited and 5xx responses with backoff
//! - Typed payloads and design-token extraction
//!
//! Nothing in here knows about sessions or the transport.

pub mod client;
pub mod error;
pub mod retry;
pub mod tokens;
pub mod types;

pub use client::FigmaClient;
pub use error::FigmaError;
pub use types::{DesignTokens, FigmaFile, FileListItem, ImageFormat};
