//! Request/response relay.
//!
//! The sequenced strategy assumes the client finishes sending before the
//! backend replies. A backend that answers early is not read until the
//! client half-closes, and a backend that waits for more request bytes
//! than the client sends stalls the exchange.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::{pump, pump_then_close, RelayOptions, RelayStats};

/// Client ⇒ backend until client EOF, then backend ⇒ client until backend EOF.
pub async fn sequenced<C, B>(
    client: &mut C,
    backend: &mut B,
    opts: &RelayOptions,
) -> io::Result<RelayStats>
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; opts.buffer_size];

    let to_backend = pump(client, backend, &mut buf, opts.idle_timeout).await?;
    let _ = backend.shutdown().await;
    tracing::trace!(bytes = to_backend, "Request forwarded");

    let to_client = pump(backend, client, &mut buf, opts.idle_timeout).await?;
    let _ = client.shutdown().await;
    tracing::trace!(bytes = to_client, "Response forwarded");

    Ok(RelayStats {
        to_backend,
        to_client,
    })
}

/// Both directions at once; finishes when each has seen EOF.
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

    let (to_backend, to_client) = tokio::try_join!(
        pump_then_close(&mut client_rd, &mut backend_wr, opts.buffer_size, opts.idle_timeout),
        pump_then_close(&mut backend_rd, &mut client_wr, opts.buffer_size, opts.idle_timeout),
    )?;

    Ok(RelayStats {
        to_backend,
        to_client,
    })
}
