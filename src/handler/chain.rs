//! Handler capability and static chain composition.

use std::sync::Arc;

use super::{CookieHandler, PathRouter, Request, RequestContext, Response};

/// A stage in the request pipeline.
///
/// A handler may mutate `ctx`, answer directly without calling `next`, or
/// delegate with `next.run(request, ctx)`. Handlers are shared by every
/// in-flight request and must keep per-request state in `ctx` only.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Request, &mut RequestContext, Next<'_>) -> Response + Send + Sync,
{
    fn handle(&self, request: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        self(request, ctx, next)
    }
}

/// The remaining stages after the current handler.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn Handler>],
}

impl<'a> Next<'a> {
    /// A continuation with no further stages.
    pub fn end() -> Self {
        Self { rest: &[] }
    }

    /// Invoke the next stage.
    ///
    /// Running past the last stage yields a 404 response.
    pub fn run(self, request: &Request, ctx: &mut RequestContext) -> Response {
        match self.rest.split_first() {
            Some((handler, rest)) => handler.handle(request, ctx, Next { rest }),
            None => Response::not_found(request.path()),
        }
    }
}

/// Ordered pipeline of handlers, assembled once and shared across requests.
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Chain {
    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    /// The standard pipeline: cookie extraction followed by path routing.
    pub fn standard(router: Arc<PathRouter>) -> Self {
        Self::builder()
            .then(CookieHandler)
            .then_shared(router)
            .build()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run a request through the chain.
    ///
    /// A fresh [`RequestContext`] is created for the request, and any
    /// `Set-Cookie` headers queued on it are attached to the final response,
    /// whichever stage produced it.
    pub fn dispatch(&self, request: &Request) -> Response {
        let mut ctx = RequestContext::new();
        let mut response = Next {
            rest: &self.handlers,
        }
        .run(request, &mut ctx);
        ctx.apply_set_cookies(&mut response);

        tracing::debug!(
            method = %request.method(),
            path = request.path(),
            status = response.status().as_u16(),
            "request dispatched"
        );
        response
    }
}

/// Builder for [`Chain`].
#[derive(Default)]
pub struct ChainBuilder {
    handlers: Vec<Arc<dyn Handler>>,
}

impl ChainBuilder {
    /// Append a handler.
    pub fn then<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append a handler that is also referenced elsewhere.
    pub fn then_shared(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn build(self) -> Chain {
        Chain {
            handlers: self.handlers,
        }
    }
}
