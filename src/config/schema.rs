//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the MCP proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Session transport tuning (grace interval, buffer sizes).
    pub session: SessionConfig,

    /// Remote Figma API client settings.
    pub figma: FigmaConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request hardening.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Session lifecycle and buffering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay between an observed disconnect and final session removal, in milliseconds.
    pub grace_period_ms: u64,

    /// Outbound frames buffered per session before `send` waits.
    pub outbound_buffer: usize,

    /// Inbound messages queued per session before `POST /message` waits.
    pub inbound_queue: usize,

    /// Interval between keep-alive comments on idle streams, in seconds (0 disables).
    pub keep_alive_secs: u64,
}

impl SessionConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn keep_alive(&self) -> Option<Duration> {
        (self.keep_alive_secs > 0).then(|| Duration::from_secs(self.keep_alive_secs))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 10_000,
            outbound_buffer: 64,
            inbound_queue: 32,
            keep_alive_secs: 15,
        }
    }
}

/// Figma REST API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FigmaConfig {
    /// Base URL of the REST API.
    pub api_base: String,

    /// Personal access token. Normally supplied via `FIGMA_ACCESS_TOKEN`.
    #[serde(skip_serializing)]
    pub access_token: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries for rate-limited (429) or 5xx responses.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// How long the `figma://files` listing stays cached, in seconds.
    pub file_list_cache_ttl_secs: u64,
}

impl Default for FigmaConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.figma.com/v1".to_string(),
            access_token: String::new(),
            timeout_secs: 30,
            max_retries: 2,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 4000,
            file_list_cache_ttl_secs: 300,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for `POST /message` handling in seconds. Streams are exempt.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum `POST /message` body size in bytes.
    pub max_body_size: usize,
    /// Answer CORS preflights with a permissive policy.
    pub cors_enabled: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 4 * 1024 * 1024, // 4MB
            cors_enabled: true,
        }
    }
}
