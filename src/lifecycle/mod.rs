//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server stops accepting → all sessions closed
//!     → open streams end → graceful shutdown completes → exit
//! ```
//!
//! Session lifecycle (Active → Draining → Closed) lives in `session`.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
