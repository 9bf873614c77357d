//! Byte relay between a client and its backend.
//!
//! # Data Flow
//! ```text
//! regular exchange   → bounded.rs
//!     sequenced: client ⇒ backend until EOF, then backend ⇒ client until EOF
//!     duplex:    both directions concurrently, each to its own EOF
//!
//! streaming exchange → streaming.rs
//!     alternating: one client chunk, one backend chunk, repeat
//!     duplex:      two copy loops, both stop when either side closes
//! ```
//!
//! # Design Decisions
//! - Generic over `AsyncRead + AsyncWrite` so relays run on any transport
//! - One fixed-size buffer per direction; bytes are forwarded in read order
//! - An I/O error ends the relay for this connection only

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{BoundedMode, RelayConfig, StreamingMode};

pub mod bounded;
pub mod streaming;

/// Tunables shared by every relay strategy.
#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Size of each read.
    pub buffer_size: usize,
    /// Deadline for any single read. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            idle_timeout: None,
        }
    }
}

/// Bytes moved in each direction by a finished relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub to_backend: u64,
    pub to_client: u64,
}

/// Run the strategy configured for this kind of exchange.
pub async fn relay<C, B>(
    client: &mut C,
    backend: &mut B,
    is_streaming: bool,
    modes: &RelayConfig,
    opts: &RelayOptions,
) -> io::Result<RelayStats>
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    if is_streaming {
        match modes.streaming {
            StreamingMode::Alternating => streaming::alternating(client, backend, opts).await,
            StreamingMode::Duplex => streaming::duplex(client, backend, opts).await,
        }
    } else {
        match modes.bounded {
            BoundedMode::Sequenced => bounded::sequenced(client, backend, opts).await,
            BoundedMode::Duplex => bounded::duplex(client, backend, opts).await,
        }
    }
}

/// Read one chunk, honouring the idle deadline.
pub async fn read_chunk<R>(
    reader: &mut R,
    buf: &mut [u8],
    idle: Option<Duration>,
) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match idle {
        Some(limit) => tokio::time::timeout(limit, reader.read(buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read idle timeout"))?,
        None => reader.read(buf).await,
    }
}

/// Copy from `reader` to `writer` until `reader` reports EOF.
pub(crate) async fn pump<R, W>(
    reader: &mut R,
    writer: &mut W,
    buf: &mut [u8],
    idle: Option<Duration>,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut total = 0u64;
    loop {
        let n = read_chunk(reader, buf, idle).await?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        total += n as u64;
    }
}

/// [`pump`], then half-close `writer` so its peer sees EOF.
pub(crate) async fn pump_then_close<R, W>(
    reader: &mut R,
    writer: &mut W,
    buf_size: usize,
    idle: Option<Duration>,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; buf_size];
    let total = pump(reader, writer, &mut buf, idle).await?;
    // The peer may already be gone; that is not a relay failure.
    let _ = writer.shutdown().await;
    Ok(total)
}
