//! Context-path routing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{Handler, Next, Request, RequestContext, Response};
use crate::error::RouterError;
use crate::Result;

/// A successful routing decision.
#[derive(Clone)]
pub struct Route {
    /// The registered prefix that matched.
    pub prefix: String,
    pub handler: Arc<dyn Handler>,
}

/// Maps path prefixes to handlers by longest match on a `/` boundary.
///
/// `/servletContext` matches `/servletContext` and `/servletContext/aa`,
/// but not `/servletContextX`. Matching is case-sensitive. The root prefix
/// `/` matches every absolute path not claimed by a longer prefix.
///
/// Lookups take a shared read lock on the route table; only `register` and
/// `unregister` take it exclusively. Readers never wait on each other, so
/// once deployments are started the lock is uncontended.
#[derive(Default)]
pub struct PathRouter {
    routes: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl PathRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `prefix`.
    ///
    /// A trailing `/` is ignored, so `/app/` and `/app` are the same prefix.
    pub fn register(&self, prefix: &str, handler: Arc<dyn Handler>) -> Result<()> {
        let prefix = normalize_prefix(prefix)?;
        let mut routes = self.routes.write().map_err(|_| RouterError::LockPoisoned)?;

        if routes.contains_key(&prefix) {
            return Err(RouterError::Conflict(prefix));
        }

        tracing::debug!(prefix = %prefix, "route registered");
        routes.insert(prefix, handler);
        Ok(())
    }

    /// Remove the handler registered under `prefix`.
    ///
    /// Returns `true` if a handler was removed. Requests already routed to it
    /// keep their own reference and complete normally.
    pub fn unregister(&self, prefix: &str) -> Result<bool> {
        let prefix = normalize_prefix(prefix)?;
        let mut routes = self.routes.write().map_err(|_| RouterError::LockPoisoned)?;
        let removed = routes.remove(&prefix).is_some();
        if removed {
            tracing::debug!(prefix = %prefix, "route unregistered");
        }
        Ok(removed)
    }

    /// Select the handler for `path`.
    pub fn route(&self, path: &str) -> Result<Route> {
        if !path.starts_with('/') {
            return Err(RouterError::NotFound(path.to_string()));
        }

        let routes = self.routes.read().map_err(|_| RouterError::LockPoisoned)?;

        // Walk candidate prefixes from the full path down to each `/` boundary.
        let mut candidate = path;
        loop {
            if let Some(handler) = routes.get(candidate) {
                return Ok(Route {
                    prefix: candidate.to_string(),
                    handler: Arc::clone(handler),
                });
            }
            match candidate.rfind('/') {
                Some(0) | None => break,
                Some(idx) => candidate = &candidate[..idx],
            }
        }

        routes
            .get("/")
            .map(|handler| Route {
                prefix: "/".to_string(),
                handler: Arc::clone(handler),
            })
            .ok_or_else(|| RouterError::NotFound(path.to_string()))
    }

    /// Check if a prefix is registered.
    pub fn contains(&self, prefix: &str) -> bool {
        let Ok(prefix) = normalize_prefix(prefix) else {
            return false;
        };
        self.routes
            .read()
            .map(|routes| routes.contains_key(&prefix))
            .unwrap_or(false)
    }

    /// Get the number of registered prefixes.
    pub fn count(&self) -> usize {
        self.routes.read().map(|r| r.len()).unwrap_or(0)
    }
}

impl Handler for PathRouter {
    fn handle(&self, request: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        match self.route(request.path()) {
            Ok(route) => {
                ctx.set_context_path(route.prefix);
                route.handler.handle(request, ctx, next)
            }
            Err(err) => {
                tracing::debug!(path = request.path(), error = %err, "no route");
                Response::not_found(request.path())
            }
        }
    }
}

/// Validate and canonicalize a route prefix or context path.
///
/// The result starts with `/` and has no trailing `/` unless it is the
/// root. Empty strings, relative paths, and prefixes containing `?`, `#`,
/// `;`, `//` or anything but visible ASCII are rejected. The result is
/// always usable as a cookie `Path`.
pub(crate) fn normalize_prefix(prefix: &str) -> Result<String> {
    let invalid = prefix.is_empty()
        || !prefix.starts_with('/')
        || prefix.contains(['?', '#', ';'])
        || prefix.contains("//")
        || !prefix.bytes().all(|b| b.is_ascii_graphic());
    if invalid {
        return Err(RouterError::InvalidContextPath(prefix.to_string()));
    }

    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
impl PathRouter {
    /// Poison the route table lock, as a panicking writer would.
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.routes.write();
            panic!("route table writer panicked");
        }));
    }
}
