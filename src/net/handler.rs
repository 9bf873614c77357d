//! Per-connection pipeline.
//!
//! # Responsibilities
//! - Read the first chunk from the client
//! - Classify it and resolve a backend
//! - Dial the backend, replay the first chunk, then relay
//!
//! # Design Decisions
//! - One outbound connection per inbound connection, never pooled
//! - Every stage returns a [`HandlerError`]; nothing is retried
//! - Sockets are owned by [`ConnectionContext`], so every exit path closes them

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::{ProxyConfig, RelayConfig};
use crate::net::connection::ConnectionState;
use crate::observability::metrics;
use crate::relay::{self, read_chunk, RelayOptions, RelayStats};
use crate::routing::{is_streaming, EndpointResolver, Resolve, RouteError, Target};

/// Why a connection ended before or during relaying.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("client closed before sending any data")]
    EmptyRequest,

    #[error("failed to read initial data: {0}")]
    Read(#[source] io::Error),

    #[error("no target endpoint: {0}")]
    Route(#[from] RouteError),

    #[error("failed to connect to {target}: {source}")]
    Dial {
        target: Target,
        #[source]
        source: io::Error,
    },

    #[error("timed out connecting to {target}")]
    DialTimeout { target: Target },

    #[error("failed to forward initial data: {0}")]
    Forward(#[source] io::Error),

    #[error("relay failed: {0}")]
    Relay(#[source] io::Error),
}

impl HandlerError {
    /// Log the failure at a level matching its severity and count it.
    pub fn report(&self) {
        match self {
            HandlerError::EmptyRequest => tracing::warn!("Empty request received"),
            HandlerError::Route(e) => {
                metrics::record_route_failure(e.reason());
                tracing::warn!(reason = e.reason(), error = %e, "No target endpoint found");
            }
            HandlerError::Dial { .. } | HandlerError::DialTimeout { .. } => {
                metrics::record_dial_failure();
                tracing::warn!(error = %self, "Backend unreachable");
            }
            HandlerError::Read(_) | HandlerError::Forward(_) | HandlerError::Relay(_) => {
                tracing::debug!(error = %self, "Connection I/O error");
            }
        }
    }
}

/// State owned by one connection for its whole life.
struct ConnectionContext<S> {
    client: S,
    backend: Option<TcpStream>,
    initial: Vec<u8>,
    is_streaming: bool,
    state: ConnectionState,
}

impl<S> ConnectionContext<S> {
    fn new(client: S) -> Self {
        Self {
            client,
            backend: None,
            initial: Vec::new(),
            is_streaming: false,
            state: ConnectionState::Accepted,
        }
    }

    fn advance(&mut self, next: ConnectionState) {
        tracing::trace!(from = %self.state, to = %next, "Connection state");
        self.state = next;
    }
}

impl<S> Drop for ConnectionContext<S> {
    fn drop(&mut self) {
        tracing::trace!(
            from = %self.state,
            backend_open = self.backend.is_some(),
            "Connection state: closed"
        );
    }
}

/// Runs the accept-to-close pipeline for individual connections.
#[derive(Debug)]
pub struct ConnectionHandler<R = EndpointResolver> {
    resolver: Arc<R>,
    relay: RelayConfig,
    options: RelayOptions,
    connect_timeout: Option<Duration>,
}

impl<R: Resolve> ConnectionHandler<R> {
    pub fn new(resolver: Arc<R>, config: &ProxyConfig) -> Self {
        Self {
            resolver,
            relay: config.relay.clone(),
            options: RelayOptions {
                buffer_size: config.buffer_size,
                idle_timeout: config.timeouts.idle_secs.map(Duration::from_secs),
            },
            connect_timeout: config.timeouts.connect_secs.map(Duration::from_secs),
        }
    }

    /// Serve one client until either side closes.
    ///
    /// Returns the bytes moved in each direction, counting the replayed
    /// first chunk as sent to the backend.
    pub async fn handle<S>(&self, client: S) -> Result<RelayStats, HandlerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut ctx = ConnectionContext::new(client);

        ctx.advance(ConnectionState::Reading);
        let mut buf = vec![0u8; self.options.buffer_size];
        let n = read_chunk(&mut ctx.client, &mut buf, self.options.idle_timeout)
            .await
            .map_err(HandlerError::Read)?;
        if n == 0 {
            return Err(HandlerError::EmptyRequest);
        }
        buf.truncate(n);
        ctx.initial = buf;
        tracing::debug!(bytes = n, "Received initial data");

        ctx.advance(ConnectionState::Classified);
        ctx.is_streaming = is_streaming(&ctx.initial);

        ctx.advance(ConnectionState::Resolving);
        let target = self.resolver.resolve(&ctx.initial, ctx.is_streaming)?;
        tracing::info!(target = %target, streaming = ctx.is_streaming, "Forwarding");

        ctx.advance(ConnectionState::Dialing);
        let stream = self.dial(&target).await?;

        ctx.advance(ConnectionState::Relaying);
        let backend = ctx.backend.insert(stream);
        backend
            .write_all(&ctx.initial)
            .await
            .map_err(HandlerError::Forward)?;

        let mut stats = relay::relay(
            &mut ctx.client,
            backend,
            ctx.is_streaming,
            &self.relay,
            &self.options,
        )
        .await
        .map_err(HandlerError::Relay)?;
        stats.to_backend += ctx.initial.len() as u64;

        Ok(stats)
    }

    async fn dial(&self, target: &Target) -> Result<TcpStream, HandlerError> {
        let connect = TcpStream::connect((target.host.as_str(), target.port));
        let result = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| HandlerError::DialTimeout {
                    target: target.clone(),
                })?,
            None => connect.await,
        };
        result.map_err(|source| HandlerError::Dial {
            target: target.clone(),
            source,
        })
    }
}
