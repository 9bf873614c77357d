//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Resolve and bind the configured address with `SO_REUSEADDR`
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//!
//! # Design Decisions
//! - A permit is acquired before `accept`, so a saturated proxy leaves
//!   pending connections in the kernel backlog instead of dropping them

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ProxyConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to resolve {address}: {source}")]
    Resolve { address: String, source: io::Error },

    #[error("{0} did not resolve to any address")]
    NoAddress(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("Failed to accept: {0}")]
    Accept(io::Error),

    #[error("Connection limiter closed")]
    Closed,
}

/// Everything needed to open the listening socket.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    /// `host:port`, resolved at bind time.
    pub address: String,
    pub backlog: u32,
    pub max_connections: usize,
}

impl From<&ProxyConfig> for ListenerSettings {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            address: config.listen_address(),
            backlog: config.backlog,
            max_connections: config.max_connections,
        }
    }
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum connections.
    max_connections: usize,
}

impl Listener {
    /// Resolve and bind the configured address with connection limits.
    pub async fn bind(settings: &ListenerSettings) -> Result<Self, ListenerError> {
        let addr = tokio::net::lookup_host(&settings.address)
            .await
            .map_err(|source| ListenerError::Resolve {
                address: settings.address.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| ListenerError::NoAddress(settings.address.clone()))?;

        let inner = bind_socket(addr, settings.backlog)
            .map_err(|source| ListenerError::Bind { addr, source })?;
        let local_addr = inner
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        tracing::info!(
            address = %local_addr,
            backlog = settings.backlog,
            max_connections = settings.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(settings.max_connections)),
            max_connections: settings.max_connections,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached.
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// Open a non-blocking listening socket with address reuse enabled.
fn bind_socket(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;
    TcpListener::from_std(socket.into())
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}
