//! Cookie handling.
//!
//! Parsing of `Cookie` request headers, serialization of `Set-Cookie`
//! response headers, and the per-deployment session cookie configuration.

pub mod codec;
mod config;

pub use codec::{parse, serialize, serialize_removal};
pub use config::{CookieSettings, SessionCookieConfig, DEFAULT_COOKIE_NAME};
