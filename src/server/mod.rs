//! HTTP server layer.
//!
//! Every inbound request is handed to the dispatch [`Chain`] through a
//! single axum fallback route; the chain decides routing, so axum only
//! provides transport.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use session_router::deployment::{DeploymentConfig, Registry, SessionCounter};
//! use session_router::server::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> session_router::Result<()> {
//!     let registry = Registry::default();
//!     let handle = registry.add_deployment(DeploymentConfig::new("/servletContext", SessionCounter))?;
//!     registry.start(&handle)?;
//!
//!     serve(ServerConfig::new("127.0.0.1", 8080), Arc::new(registry.chain())).await
//! }
//! ```
//!
//! [`Chain`]: crate::handler::Chain

mod router;
mod sweeper;

pub use router::{create_router, serve, ServerConfig, MAX_BODY_BYTES};
pub use sweeper::spawn_sweeper;
