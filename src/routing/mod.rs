//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! POST /message?sessionId=<id>  (raw body)
//!     → router.rs (validate, exact lookup)
//!     → session inbound queue
//!     → Return: accepted, or a RouteError mapped to an HTTP status
//! ```

pub mod router;

pub use router::{MessageRouter, RouteError};
