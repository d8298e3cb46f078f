//! Configuration validation.
//!
//! Semantic checks that serde cannot express: addresses parse, capacities are
//! non-zero, the access token is present. Returns every error, not just the
//! first, so an operator can fix a config file in one pass.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("FIGMA_ACCESS_TOKEN is required")]
    MissingAccessToken,

    #[error("figma.api_base '{0}' is not an absolute http(s) URL")]
    InvalidApiBase(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.figma.access_token.trim().is_empty() {
        errors.push(ValidationError::MissingAccessToken);
    }

    match Url::parse(&config.figma.api_base) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidApiBase(config.figma.api_base.clone())),
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let capacities = [
        ("session.outbound_buffer", config.session.outbound_buffer),
        ("session.inbound_queue", config.session.inbound_queue),
        ("security.max_body_size", config.security.max_body_size),
    ];
    for (name, value) in capacities {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.figma.timeout_secs == 0 {
        errors.push(ValidationError::Zero("figma.timeout_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.figma.access_token = "figd_test".into();
        config
    }

    #[test]
    fn default_config_with_token_is_valid() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn missing_token_is_reported() {
        let errors = validate_config(&ServerConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingAccessToken]);
    }

    #[test]
    fn reports_all_errors_at_once() {
        let mut config = valid_config();
        config.listener.bind_address = "not-an-address".into();
        config.figma.api_base = "ftp://example.com".into();
        config.session.inbound_queue = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero("session.inbound_queue")));
    }

    #[test]
    fn metrics_address_only_checked_when_enabled() {
        let mut config = valid_config();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
