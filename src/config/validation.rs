//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, buffer sizes, timeouts)
//! - Detect duplicate endpoint names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Smallest accepted listen backlog.
pub const MIN_BACKLOG: u32 = 10;

/// Largest accepted transfer unit.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint #{index} has an empty name")]
    EmptyEndpointName { index: usize },

    #[error("endpoint name '{0}' is declared more than once")]
    DuplicateEndpoint(String),

    #[error("endpoint '{0}' has an empty match_field")]
    EmptyMatchField(String),

    #[error("endpoint '{0}' has an empty target_host")]
    EmptyTargetHost(String),

    #[error("endpoint '{0}' has target_port 0")]
    ZeroTargetPort(String),

    #[error("max_connections must be greater than 0")]
    ZeroMaxConnections,

    #[error("backlog must be at least 10, got {0}")]
    BacklogTooSmall(u32),

    #[error("buffer_size must be between 1 and 1048576, got {0}")]
    BufferSize(usize),

    #[error("timeouts.{0} must be greater than 0 when set")]
    ZeroTimeout(&'static str),

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.log_format must be 'pretty' or 'json', got '{0}'")]
    LogFormat(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for (index, endpoint) in config.endpoints.iter().enumerate() {
        if endpoint.name.trim().is_empty() {
            errors.push(ValidationError::EmptyEndpointName { index });
        } else if !seen.insert(endpoint.name.as_str()) {
            errors.push(ValidationError::DuplicateEndpoint(endpoint.name.clone()));
        }
        if endpoint.match_field.is_empty() {
            errors.push(ValidationError::EmptyMatchField(endpoint.name.clone()));
        }
        if endpoint.target_host.trim().is_empty() {
            errors.push(ValidationError::EmptyTargetHost(endpoint.name.clone()));
        }
        if endpoint.target_port == 0 {
            errors.push(ValidationError::ZeroTargetPort(endpoint.name.clone()));
        }
    }

    if config.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.backlog < MIN_BACKLOG {
        errors.push(ValidationError::BacklogTooSmall(config.backlog));
    }
    if config.buffer_size == 0 || config.buffer_size > MAX_BUFFER_SIZE {
        errors.push(ValidationError::BufferSize(config.buffer_size));
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.idle_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("idle_secs"));
    }

    let obs = &config.observability;
    if !matches!(
        obs.log_level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::LogLevel(obs.log_level.clone()));
    }
    if !matches!(obs.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(obs.log_format.clone()));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
