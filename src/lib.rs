//! Payload-routing TCP reverse proxy.
//!
//! Inspects the first chunk a client sends, picks a backend from a JSON body
//! field (falling back to the `Host:` header), then relays raw bytes until
//! either side closes.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod routing;

pub use config::ProxyConfig;
pub use lifecycle::Shutdown;
pub use net::ProxyServer;
