//! # session-router
//!
//! Request dispatch with cookie-based session affinity.
//!
//! Requests flow through an ordered [`Chain`] of handlers: the session
//! cookie is extracted, the longest matching context path picks a
//! deployment, and the deployment's application sees a per-request
//! [`Exchange`] from which it can obtain its session. Sessions live in a
//! per-deployment [`SessionStore`] keyed by unguessable identifiers and
//! expire after an idle timeout.
//!
//! ## Features
//!
//! - **Cookie codec**: RFC 6265 `Cookie` parsing and `Set-Cookie` rendering
//! - **Session store**: concurrent, CSPRNG identifiers, idle expiry
//! - **Path router**: longest-prefix matching on segment boundaries
//! - **Deployment lifecycle**: deploy, start, stop, undeploy
//! - **axum bridge**: serve any chain over HTTP with tracing
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use session_router::{DeploymentConfig, Registry, SessionCounter};
//!
//! #[tokio::main]
//! async fn main() -> session_router::Result<()> {
//!     session_router::logging::try_init().ok();
//!
//!     let registry = Registry::default();
//!     let handle = registry.add_deployment(
//!         DeploymentConfig::new("/servletContext", SessionCounter),
//!     )?;
//!     handle.session_cookie_config().set_name("MySessionCookie")?;
//!     registry.start(&handle)?;
//!
//!     let chain = Arc::new(registry.chain());
//!     session_router::server::serve(Default::default(), chain).await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod cookie;
pub mod deployment;
pub mod error;
pub mod handler;
pub mod logging;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use cookie::{CookieSettings, SessionCookieConfig};
pub use deployment::{
    Application, DeploymentConfig, DeploymentHandle, DeploymentState, Exchange, Registry,
    SessionCounter,
};
pub use error::{Result, RouterError};
pub use handler::{Chain, Handler, Next, PathRouter, Request, RequestContext, Response};
pub use session::{SessionHandle, SessionId, SessionStore};
