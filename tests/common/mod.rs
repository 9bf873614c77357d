//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use payload_proxy::config::{EndpointConfig, ProxyConfig};
use payload_proxy::routing::Resolve;
use payload_proxy::{ProxyServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Start a backend that reads each request to EOF, then answers with `tag`.
pub async fn start_tagged_backend(tag: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                if socket.read_to_end(&mut request).await.is_ok() {
                    let _ = socket.write_all(tag.as_bytes()).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that writes back every chunk as soon as it arrives.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// A port nothing is listening on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn endpoint(name: &str, field: &str, value: &str, target: SocketAddr) -> EndpointConfig {
    EndpointConfig {
        name: name.into(),
        match_field: field.into(),
        match_value: value.into(),
        target_host: target.ip().to_string(),
        target_port: target.port(),
    }
}

/// Loopback config on an ephemeral port.
pub fn proxy_config(endpoints: Vec<EndpointConfig>) -> ProxyConfig {
    ProxyConfig {
        proxy_host: "127.0.0.1".into(),
        proxy_port: 0,
        endpoints,
        ..ProxyConfig::default()
    }
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<()>,
}

/// Bind and run a proxy with the endpoint table from `config`.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let server = ProxyServer::bind(&config).await.unwrap();
    spawn_server(server)
}

/// Bind and run a proxy with a custom resolver.
pub async fn start_proxy_with<R: Resolve>(config: ProxyConfig, resolver: R) -> RunningProxy {
    let server = ProxyServer::with_resolver(&config, Arc::new(resolver))
        .await
        .unwrap();
    spawn_server(server)
}

fn spawn_server<R: Resolve>(server: ProxyServer<R>) -> RunningProxy {
    let addr = server.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let task = tokio::spawn(server.run(rx));
    RunningProxy {
        addr,
        shutdown,
        task,
    }
}

/// Send `request`, half-close, and collect everything the proxy returns.
pub async fn exchange(proxy: SocketAddr, request: &[u8]) -> io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(proxy).await?;
    stream.write_all(request).await?;
    stream.shutdown().await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}

/// True if the proxy closed the connection without sending anything.
pub fn closed_without_reply(result: &io::Result<Vec<u8>>) -> bool {
    match result {
        Ok(bytes) => bytes.is_empty(),
        Err(e) => matches!(
            e.kind(),
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected
        ),
    }
}

pub fn json_request(body: &str) -> Vec<u8> {
    format!("POST /api/endpoint HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{body}").into_bytes()
}
