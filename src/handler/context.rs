//! Per-request context carried through the handler chain.

use std::collections::HashMap;

use axum::http::{header, HeaderValue};

use super::Response;
use crate::session::SessionId;

/// Transient state for one request.
///
/// Created at request entry and dropped once the response is complete. The
/// session is held by identifier only; the store stays its owner.
#[derive(Debug, Default)]
pub struct RequestContext {
    cookies: HashMap<String, String>,
    session_id: Option<SessionId>,
    context_path: Option<String>,
    set_cookies: Vec<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request cookie. The first value seen for a name wins.
    ///
    /// Returns `false` if the name was already present.
    pub fn insert_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.cookies.contains_key(&name) {
            return false;
        }
        self.cookies.insert(name, value.into());
        true
    }

    /// Get a request cookie value.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|s| s.as_str())
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    /// Identifier of the session resolved for this request, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn set_session_id(&mut self, id: SessionId) {
        self.session_id = Some(id);
    }

    pub fn take_session_id(&mut self) -> Option<SessionId> {
        self.session_id.take()
    }

    /// Context path of the deployment the request was routed to.
    pub fn context_path(&self) -> Option<&str> {
        self.context_path.as_deref()
    }

    pub fn set_context_path(&mut self, path: impl Into<String>) {
        self.context_path = Some(path.into());
    }

    /// Queue a `Set-Cookie` header for the response.
    pub fn add_set_cookie(&mut self, header: String) {
        self.set_cookies.push(header);
    }

    /// Drop queued `Set-Cookie` headers for the cookie `name`.
    pub fn remove_set_cookies(&mut self, name: &str) {
        self.set_cookies.retain(|header| {
            header
                .split_once('=')
                .map_or(true, |(queued, _)| queued != name)
        });
    }

    /// Queued `Set-Cookie` header values.
    pub fn set_cookies(&self) -> &[String] {
        &self.set_cookies
    }

    /// Move queued `Set-Cookie` headers onto the response.
    pub fn apply_set_cookies(&mut self, response: &mut Response) {
        for cookie in self.set_cookies.drain(..) {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
                Err(_) => tracing::warn!("dropping unencodable Set-Cookie header"),
            }
        }
    }
}
