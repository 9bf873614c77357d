//! Endpoint resolution.
//!
//! # Responsibilities
//! - Split the first client chunk into headers and body
//! - Match the JSON body against the endpoint table
//! - Fall back to the request's own `Host:` header
//! - Report why a connection could not be routed
//!
//! # Design Decisions
//! - An `Err` is the "no route" decision; the handler closes the connection
//! - Streaming exchanges are never routed here; a different [`Resolve`]
//!   implementation is the extension point for that
//! - The table is borrowed, never written

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::host::{find_host_line, parse_host_header, HostHeaderError};
use super::matcher::EndpointTable;

/// Delimiter between the header block and the body.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Backend address a connection is relayed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Why no target could be chosen for a connection.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("request has no header terminator")]
    MissingDelimiter,

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("request body is not a JSON object")]
    BodyNotObject,

    #[error("no rule matched and the request has no Host header")]
    MissingHostHeader,

    #[error("no rule matched and the Host header is unusable: {0}")]
    HostHeader(#[from] HostHeaderError),

    #[error("streaming exchanges have no routing")]
    StreamingUnrouted,
}

impl RouteError {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            RouteError::MissingDelimiter => "missing_delimiter",
            RouteError::InvalidBody(_) => "invalid_body",
            RouteError::BodyNotObject => "body_not_object",
            RouteError::MissingHostHeader => "missing_host",
            RouteError::HostHeader(_) => "bad_host",
            RouteError::StreamingUnrouted => "streaming_unrouted",
        }
    }
}

/// Chooses a backend from the first chunk a client sent.
pub trait Resolve: Send + Sync + 'static {
    fn resolve(&self, initial: &[u8], is_streaming: bool) -> Result<Target, RouteError>;
}

/// Payload-first resolver with `Host:` header fallback.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    table: Arc<EndpointTable>,
}

impl EndpointResolver {
    pub fn new(table: Arc<EndpointTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &EndpointTable {
        &self.table
    }

    fn resolve_regular(&self, initial: &[u8]) -> Result<Target, RouteError> {
        let split = initial
            .windows(HEADER_TERMINATOR.len())
            .position(|w| w == HEADER_TERMINATOR)
            .ok_or(RouteError::MissingDelimiter)?;
        let headers = &initial[..split];
        let body = &initial[split + HEADER_TERMINATOR.len()..];

        let body = match serde_json::from_slice::<Value>(body)? {
            Value::Object(map) => map,
            _ => return Err(RouteError::BodyNotObject),
        };
        tracing::debug!(fields = body.len(), "Parsed request body");

        if let Some(rule) = self.table.find(&body) {
            tracing::debug!(endpoint = rule.name(), "Endpoint rule matched");
            return Ok(rule.target().clone());
        }

        let host_line = find_host_line(headers).ok_or(RouteError::MissingHostHeader)?;
        Ok(parse_host_header(host_line)?)
    }
}

impl Resolve for EndpointResolver {
    fn resolve(&self, initial: &[u8], is_streaming: bool) -> Result<Target, RouteError> {
        if is_streaming {
            return Err(RouteError::StreamingUnrouted);
        }
        self.resolve_regular(initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::EndpointRule;

    fn resolver() -> EndpointResolver {
        let table = EndpointTable::new(vec![
            EndpointRule::new("api1", "field1", "value1", "api1.example.com", 80),
            EndpointRule::new("api2", "field2", "value2", "api2.example.com", 8080),
        ]);
        EndpointResolver::new(Arc::new(table))
    }

    #[test]
    fn payload_rule_selects_target() {
        let req = b"POST /api/endpoint HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"field1\": \"value1\"}";
        let target = resolver().resolve(req, false).unwrap();
        assert_eq!(target, Target::new("api1.example.com", 80));

        let req = b"POST / HTTP/1.1\r\n\r\n{\"field2\": \"value2\"}";
        let target = resolver().resolve(req, false).unwrap();
        assert_eq!(target, Target::new("api2.example.com", 8080));
    }

    #[test]
    fn rule_wins_over_host_header() {
        let req = b"POST / HTTP/1.1\r\nHost: example.com:9090\r\n\r\n{\"field1\": \"value1\"}";
        let target = resolver().resolve(req, false).unwrap();
        assert_eq!(target, Target::new("api1.example.com", 80));
    }

    #[test]
    fn rule_wins_even_with_malformed_host_header() {
        let req = b"POST / HTTP/1.1\r\nHost: example.com:bad\r\n\r\n{\"field1\": \"value1\"}";
        let target = resolver().resolve(req, false).unwrap();
        assert_eq!(target, Target::new("api1.example.com", 80));
    }

    #[test]
    fn falls_back_to_host_header() {
        let req = b"POST / HTTP/1.1\r\nHost: example.com:9090\r\n\r\n{\"field1\": \"value2\"}";
        let target = resolver().resolve(req, false).unwrap();
        assert_eq!(target, Target::new("example.com", 9090));

        let req = b"POST / HTTP/1.1\r\nHost: example.com\r\n\r\n{}";
        let target = resolver().resolve(req, false).unwrap();
        assert_eq!(target, Target::new("example.com", 80));
    }

    #[test]
    fn no_match_and_no_host_is_unroutable() {
        let req = b"POST / HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"field1\": \"value2\"}";
        assert!(matches!(
            resolver().resolve(req, false),
            Err(RouteError::MissingHostHeader)
        ));

        let req = b"POST / HTTP/1.1\r\nHost: \r\n\r\n{}";
        assert!(matches!(
            resolver().resolve(req, false),
            Err(RouteError::HostHeader(HostHeaderError::EmptyHost))
        ));
    }

    #[test]
    fn malformed_input_is_unroutable() {
        let r = resolver();
        assert!(matches!(
            r.resolve(b"GET / HTTP/1.1\r\nHost: example.com\r\n", false),
            Err(RouteError::MissingDelimiter)
        ));
        assert!(matches!(
            r.resolve(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n", false),
            Err(RouteError::InvalidBody(_))
        ));
        assert!(matches!(
            r.resolve(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\nnot json", false),
            Err(RouteError::InvalidBody(_))
        ));
        assert!(matches!(
            r.resolve(b"POST / HTTP/1.1\r\nHost: example.com\r\n\r\n[1, 2]", false),
            Err(RouteError::BodyNotObject)
        ));
    }

    #[test]
    fn streaming_is_never_routed() {
        let req = b"POST /stream HTTP/1.1\r\nHost: example.com\r\nTransfer-Encoding: chunked\r\n\r\n{\"field1\": \"value1\"}";
        let err = resolver().resolve(req, true).unwrap_err();
        assert!(matches!(err, RouteError::StreamingUnrouted));
        assert_eq!(err.reason(), "streaming_unrouted");
    }

    #[test]
    fn resolution_leaves_table_untouched() {
        let r = resolver();
        let before = r.table().clone();
        let req = b"POST / HTTP/1.1\r\n\r\n{\"field2\": \"value2\"}";
        let first = r.resolve(req, false).unwrap();
        let second = r.resolve(req, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(r.table(), &before);
    }
}
