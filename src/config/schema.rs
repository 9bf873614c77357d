//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::{EndpointRule, EndpointTable};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Host name or address to listen on.
    pub proxy_host: String,

    /// Port to listen on.
    pub proxy_port: u16,

    /// Maximum concurrently handled connections (backpressure at accept).
    pub max_connections: usize,

    /// Pending-connection backlog passed to `listen(2)`.
    pub backlog: u32,

    /// Fixed transfer unit for every read and write, in bytes.
    pub buffer_size: usize,

    /// Routing rules, evaluated in declaration order.
    pub endpoints: Vec<EndpointConfig>,

    /// Relay strategy selection.
    pub relay: RelayConfig,

    /// Optional dial and read deadlines.
    pub timeouts: TimeoutConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_host: "localhost".to_string(),
            proxy_port: 8080,
            max_connections: 10,
            backlog: 128,
            buffer_size: 4096,
            endpoints: Vec::new(),
            relay: RelayConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Freeze the configured endpoints into an immutable lookup table.
    pub fn endpoint_table(&self) -> EndpointTable {
        self.endpoints
            .iter()
            .map(|e| {
                EndpointRule::new(
                    e.name.clone(),
                    e.match_field.clone(),
                    e.match_value.clone(),
                    e.target_host.clone(),
                    e.target_port,
                )
            })
            .collect()
    }

    /// `host:port` string the listener resolves at startup.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.proxy_host, self.proxy_port)
    }
}

/// A single payload-routing rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// Logical endpoint name, unique within the table.
    pub name: String,

    /// Top-level body field inspected for the routing key.
    pub match_field: String,

    /// Value the field must equal for this rule to match.
    pub match_value: String,

    /// Backend host.
    pub target_host: String,

    /// Backend port.
    pub target_port: u16,
}

/// How bounded (request/response) exchanges are relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundedMode {
    /// Client to backend until EOF, then backend to client until EOF.
    #[default]
    Sequenced,
    /// Both directions copied concurrently.
    Duplex,
}

/// How streaming (chunked) exchanges are relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingMode {
    /// One client chunk, then one backend chunk, repeated.
    #[default]
    Alternating,
    /// Two independent copy loops, stopped together when either side closes.
    Duplex,
}

/// Relay strategy selection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bounded: BoundedMode,
    pub streaming: StreamingMode,
}

/// Timeout configuration. Dial and read deadlines are off unless set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend dial deadline in seconds.
    pub connect_secs: Option<u64>,

    /// Deadline for any single read, in seconds.
    pub idle_secs: Option<u64>,

    /// How long shutdown waits for in-flight connections, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: None,
            idle_secs: None,
            shutdown_grace_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
