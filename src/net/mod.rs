//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (permit, then accept)
//!     → server.rs (spawn task, tracing span, drain on shutdown)
//!     → handler.rs (read → classify → resolve → dial → relay)
//!     → connection.rs (ids, state names, active count)
//!
//! Connection States:
//!     Accepted → Reading → Classified → Resolving → Dialing → Relaying → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - A failing connection never reaches the accept loop
//! - Each connection tracked for graceful shutdown

pub mod connection;
pub mod handler;
pub mod listener;
pub mod server;

pub use handler::{ConnectionHandler, HandlerError};
pub use listener::{Listener, ListenerError, ListenerSettings};
pub use server::ProxyServer;
