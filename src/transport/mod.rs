//! Outbound streaming transport.
//!
//! # Data Flow
//! ```text
//! engine reply (serialized JSON-RPC)
//!     → channel.rs (OutboundChannel::send, ordered queue per session)
//!     → frame.rs (message_event → axum sse::Event)
//!     → EventStream (wrapped in axum's Sse response, keep-alive comments added there)
//!     → client
//! ```
//!
//! # Design Decisions
//! - The handshake frame is owned by the stream, not queued, so it cannot be
//!   delayed or reordered behind messages
//! - One bounded queue per session preserves send order
//! - Dropping the response body is the disconnect signal

pub mod channel;
pub mod frame;

pub use channel::{ChannelError, EventStream, OutboundChannel};
pub use frame::{endpoint_path, ENDPOINT_EVENT, KEEP_ALIVE_TEXT};

/// Path clients post their messages to.
pub const MESSAGE_PATH: &str = "/message";
