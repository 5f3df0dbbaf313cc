//! Request dispatch.
//!
//! Requests flow through a [`Chain`] of [`Handler`]s built once at startup:
//! [`CookieHandler`] fills the [`RequestContext`] with request cookies, then
//! [`PathRouter`] hands the request to the deployment registered under the
//! longest matching context path.

mod chain;
mod context;
mod cookies;
mod request;
mod router;

pub use chain::{Chain, ChainBuilder, Handler, Next};
pub use context::RequestContext;
pub use cookies::CookieHandler;
pub use request::{Request, Response};
pub use router::{PathRouter, Route};

pub(crate) use router::normalize_prefix;
