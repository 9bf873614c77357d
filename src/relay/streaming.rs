//! Streaming relay.
//!
//! `alternating` reads one chunk from each side in turn, so a backend that
//! is slow to answer delays the next client read. `duplex` runs one copy
//! loop per direction and stops both as soon as either finishes.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::{pump_then_close, read_chunk, RelayOptions, RelayStats};

/// Client chunk ⇒ backend, backend chunk ⇒ client, until either side closes.
pub async fn alternating<C, B>(
    client: &mut C,
    backend: &mut B,
    opts: &RelayOptions,
) -> io::Result<RelayStats>
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; opts.buffer_size];
    let mut stats = RelayStats::default();

    loop {
        let n = read_chunk(client, &mut buf, opts.idle_timeout).await?;
        if n == 0 {
            tracing::trace!("Client closed stream");
            break;
        }
        backend.write_all(&buf[..n]).await?;
        backend.flush().await?;
        stats.to_backend += n as u64;

        let n = read_chunk(backend, &mut buf, opts.idle_timeout).await?;
        if n == 0 {
            tracing::trace!("Backend closed stream");
            break;
        }
        client.write_all(&buf[..n]).await?;
        client.flush().await?;
        stats.to_client += n as u64;
    }

    Ok(stats)
}

/// Independent copy loops; the first to finish ends the relay.
pub async fn duplex<C, B>(
    client: &mut C,
    backend: &mut B,
    opts: &RelayOptions,
) -> io::Result<RelayStats>
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_rd, mut client_wr) = tokio::io::split(client);
    let (mut backend_rd, mut backend_wr) = tokio::io::split(backend);

    // Byte counts of the loop that lost the race are not observable once it
    // is dropped, so only the finished direction is reported.
    let stats = tokio::select! {
        res = pump_then_close(&mut client_rd, &mut backend_wr, opts.buffer_size, opts.idle_timeout) => {
            RelayStats { to_backend: res?, to_client: 0 }
        }
        res = pump_then_close(&mut backend_rd, &mut client_wr, opts.buffer_size, opts.idle_timeout) => {
            RelayStats { to_backend: 0, to_client: res? }
        }
    };

    Ok(stats)
}
