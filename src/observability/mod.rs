//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stderr
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Session ids are attached as a `session_id` field, never interpolated
//! - Request ids come from the HTTP layer and appear on every request span
//! - Metrics are recorded unconditionally and cost nothing without a recorder

pub mod logging;
pub mod metrics;
