//! Cookie extraction stage.

use axum::http::header;

use super::{Handler, Next, Request, RequestContext, Response};
use crate::cookie;

/// Parses every `Cookie` header into the request context, then delegates.
///
/// Malformed headers are skipped, never rejected. This stage always calls
/// the next one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieHandler;

impl Handler for CookieHandler {
    fn handle(&self, request: &Request, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        for value in request.headers().get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                tracing::warn!("ignoring non-UTF-8 Cookie header");
                continue;
            };

            let pairs = cookie::parse(value);
            if pairs.is_empty() && !value.trim().is_empty() {
                tracing::warn!(header = value, "ignoring malformed Cookie header");
            }

            for (name, value) in pairs {
                ctx.insert_cookie(name, value);
            }
        }

        next.run(request, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Chain;
    use axum::http::HeaderValue;

    fn echo_chain() -> Chain {
        Chain::builder()
            .then(CookieHandler)
            .then(|_: &Request, ctx: &mut RequestContext, _: Next<'_>| {
                let mut names: Vec<_> = ctx
                    .cookies()
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                names.sort();
                Response::ok(names.join(","))
            })
            .build()
    }

    #[test]
    fn test_extracts_cookies() {
        let request = Request::get("/")
            .with_header(header::COOKIE, HeaderValue::from_static("b=2; a=1"));
        assert_eq!(echo_chain().dispatch(&request).body_text(), "a=1,b=2");
    }

    #[test]
    fn test_merges_headers_first_wins() {
        let request = Request::get("/")
            .with_header(header::COOKIE, HeaderValue::from_static("a=1"))
            .with_header(header::COOKIE, HeaderValue::from_static("a=9; b=2"));
        assert_eq!(echo_chain().dispatch(&request).body_text(), "a=1,b=2");
    }

    #[test]
    fn test_malformed_header_still_delegates() {
        let request = Request::get("/")
            .with_header(header::COOKIE, HeaderValue::from_static("garbage"))
            .with_header(header::COOKIE, HeaderValue::from_static("ok=1"));
        let response = echo_chain().dispatch(&request);
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(response.body_text(), "ok=1");
    }

    #[test]
    fn test_no_cookie_header() {
        assert_eq!(echo_chain().dispatch(&Request::get("/")).body_text(), "");
    }
}
