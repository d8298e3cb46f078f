//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! GET /sse
//!     → lifecycle.rs (LifecycleManager::open)
//!         → registry.rs (reserve id, insert record)
//!         → inbound worker + disconnect watcher tasks
//!     → EventStream returned as the response body
//!
//! stream dropped
//!     → Draining → grace interval → Closed → removed
//! ```

pub mod id;
pub mod lifecycle;
pub mod record;
pub mod registry;

pub use id::SessionId;
pub use lifecycle::LifecycleManager;
pub use record::{Session, SessionState};
pub use registry::SessionRegistry;
