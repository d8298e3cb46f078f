//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! GET|POST /sse
//!     → handlers.rs (open session, stream EventStream as the body)
//!
//! POST /message?sessionId=<id>
//!     → handlers.rs (resolve id from query or header)
//!     → routing (queue message for the session)
//!     → response.rs (RouteError → status + JSON body)
//!
//! GET /health
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use handlers::AppState;
pub use server::HttpServer;
