//! Figma MCP proxy library.
//!
//! Serves the Model Context Protocol over a session-multiplexed
//! Server-Sent Events transport and answers tool and resource requests from
//! the Figma REST API.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;
pub mod session;
pub mod transport;

// Protocol and upstream
pub mod engine;
pub mod figma;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
