//! Accept loop.
//!
//! # Responsibilities
//! - Accept connections under the listener's concurrency limit
//! - Spawn one task per connection inside its own tracing span
//! - Keep accepting no matter how individual connections end
//! - On shutdown, stop accepting and let in-flight connections drain

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::net::connection::ConnectionTracker;
use crate::net::handler::ConnectionHandler;
use crate::net::listener::{Listener, ListenerError, ListenerSettings};
use crate::observability::metrics;
use crate::routing::{EndpointResolver, Resolve};

/// Pause after a failed `accept` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// The proxy: a bound listener plus the handler every connection runs.
pub struct ProxyServer<R = EndpointResolver> {
    listener: Listener,
    handler: Arc<ConnectionHandler<R>>,
    tracker: ConnectionTracker,
    drain_timeout: Duration,
}

impl ProxyServer<EndpointResolver> {
    /// Bind using the endpoint table from `config`.
    pub async fn bind(config: &ProxyConfig) -> Result<Self, ListenerError> {
        let table = Arc::new(config.endpoint_table());
        tracing::info!(endpoints = table.len(), "Endpoint table loaded");
        Self::with_resolver(config, Arc::new(EndpointResolver::new(table))).await
    }
}

impl<R: Resolve> ProxyServer<R> {
    /// Bind with a caller-supplied resolver.
    pub async fn with_resolver(config: &ProxyConfig, resolver: Arc<R>) -> Result<Self, ListenerError> {
        let listener = Listener::bind(&ListenerSettings::from(config)).await?;
        Ok(Self {
            listener,
            handler: Arc::new(ConnectionHandler::new(resolver, config)),
            tracker: ConnectionTracker::new(),
            drain_timeout: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the in-flight connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept until `shutdown` fires, then drain.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(address = %addr, "Proxy listening");
        }

        loop {
            let accepted = tokio::select! {
                res = self.listener.accept() => res,
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            };

            let (stream, peer, permit) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "Accept error");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };

            let guard = self.tracker.track();
            let handler = Arc::clone(&self.handler);
            let span = tracing::info_span!("connection", id = %guard.id(), peer = %peer);

            tokio::spawn(
                async move {
                    metrics::record_accepted();
                    tracing::info!("Accepted connection");
                    let started = Instant::now();

                    match handler.handle(stream).await {
                        Ok(stats) => {
                            metrics::record_relayed(&stats);
                            tracing::info!(
                                to_backend = stats.to_backend,
                                to_client = stats.to_client,
                                "Relay finished"
                            );
                        }
                        Err(e) => e.report(),
                    }

                    metrics::record_connection_duration(started.elapsed());
                    tracing::info!("Connection closed");
                    drop(guard);
                    drop(permit);
                }
                .instrument(span),
            );
        }

        if self.tracker.wait_for_drain(self.drain_timeout).await {
            tracing::info!("All connections drained");
        } else {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Drain timeout elapsed with connections still open"
            );
        }
    }
}
