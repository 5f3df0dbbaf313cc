//! Application seam and the per-request session accessor.

use std::sync::Arc;

use crate::cookie::SessionCookieConfig;
use crate::handler::{Handler, Next, Request, RequestContext, Response};
use crate::session::{SessionHandle, SessionManager};
use crate::Result;

/// Application logic served by a deployment.
///
/// Returning `Err` produces a `500` response; the error is logged and never
/// reaches the client.
pub trait Application: Send + Sync {
    fn service(&self, request: &Request, exchange: &mut Exchange<'_>) -> Result<Response>;
}

impl<F> Application for F
where
    F: Fn(&Request, &mut Exchange<'_>) -> Result<Response> + Send + Sync,
{
    fn service(&self, request: &Request, exchange: &mut Exchange<'_>) -> Result<Response> {
        self(request, exchange)
    }
}

/// What an application sees of the dispatch machinery for one request.
pub struct Exchange<'a> {
    ctx: &'a mut RequestContext,
    sessions: &'a SessionManager,
}

impl<'a> Exchange<'a> {
    pub fn new(ctx: &'a mut RequestContext, sessions: &'a SessionManager) -> Self {
        Self { ctx, sessions }
    }

    /// The request's session, created on first use.
    pub fn session(&mut self) -> Result<SessionHandle> {
        self.sessions.session(self.ctx)
    }

    /// The request's session if the client presented a live one.
    pub fn existing_session(&mut self) -> Result<Option<SessionHandle>> {
        self.sessions.existing_session(self.ctx)
    }

    /// Invalidate the request's session, if any.
    pub fn invalidate_session(&mut self) -> Result<bool> {
        self.sessions.invalidate(self.ctx)
    }

    /// A request cookie by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.ctx.cookie(name)
    }

    /// Context path the request was routed under.
    pub fn context_path(&self) -> &str {
        self.ctx.context_path().unwrap_or("/")
    }

    /// Request path relative to the context path.
    pub fn path_within_context<'r>(&self, request: &'r Request) -> &'r str {
        let path = request.path();
        match self.ctx.context_path() {
            Some("/") | None => path,
            Some(prefix) => path.strip_prefix(prefix).unwrap_or(path),
        }
    }

    pub fn session_cookie_config(&self) -> &SessionCookieConfig {
        self.sessions.cookie_config()
    }
}

/// Chain stage that runs a deployment's application.
pub(crate) struct DeploymentHandler {
    context_path: String,
    application: Arc<dyn Application>,
    sessions: SessionManager,
}

impl DeploymentHandler {
    pub(crate) fn new(
        context_path: String,
        application: Arc<dyn Application>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            context_path,
            application,
            sessions,
        }
    }
}

impl Handler for DeploymentHandler {
    fn handle(&self, request: &Request, ctx: &mut RequestContext, _next: Next<'_>) -> Response {
        let mut exchange = Exchange::new(ctx, &self.sessions);
        match self.application.service(request, &mut exchange) {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    deployment = %self.context_path,
                    path = request.path(),
                    error = %err,
                    "application failed"
                );
                Response::internal_error()
            }
        }
    }
}
