//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! First client chunk
//!     → classifier.rs (streaming or regular?)
//!     → router.rs (split headers/body, parse JSON body)
//!     → matcher.rs (scan endpoint table, first match wins)
//!     → host.rs (fallback: target from the Host header)
//!     → Return: Target or RouteError
//! ```
//!
//! # Design Decisions
//! - Endpoint table built at startup, immutable at runtime
//! - Deterministic: same input always resolves to the same target
//! - Malformed input never panics; it becomes a RouteError

pub mod classifier;
pub mod host;
pub mod matcher;
pub mod router;

pub use classifier::is_streaming;
pub use host::{parse_host_header, HostHeaderError};
pub use matcher::{EndpointRule, EndpointTable};
pub use router::{EndpointResolver, Resolve, RouteError, Target};
