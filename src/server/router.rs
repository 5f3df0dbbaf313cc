//! axum bridge into the handler chain.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request as HttpRequest, State},
    http::StatusCode,
    response::{IntoResponse, Response as HttpResponse},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::error::RouterError;
use crate::handler::{Chain, Request, Response};

/// Largest request body read into memory.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Create an axum router that feeds every request through `chain`.
pub fn create_router(chain: Arc<Chain>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(chain)
}

async fn dispatch(State(chain): State<Arc<Chain>>, request: HttpRequest) -> HttpResponse {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let request = Request::from_parts(parts.method, parts.uri, parts.headers, body);
    into_http(chain.dispatch(&request))
}

fn into_http(response: Response) -> HttpResponse {
    let (status, headers, body) = response.into_parts();
    let mut http = HttpResponse::new(Body::from(body));
    *http.status_mut() = status;
    *http.headers_mut() = headers;
    http
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Stop accepting connections on Ctrl-C and drain in-flight requests.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            graceful_shutdown: true,
        }
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 8080)
    }
}

/// Start the HTTP server.
pub async fn serve(config: ServerConfig, chain: Arc<Chain>) -> crate::Result<()> {
    let addr = config.bind_address();
    let router = create_router(chain);

    tracing::info!("Starting session-router on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(RouterError::Io)?;

    let server = axum::serve(listener, router);
    let result = if config.graceful_shutdown {
        server.with_graceful_shutdown(shutdown_signal()).await
    } else {
        server.await
    };

    result.map_err(RouterError::Io)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.graceful_shutdown);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_server_config_custom() {
        let config = ServerConfig::new("0.0.0.0", 9000).without_graceful_shutdown();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert!(!config.graceful_shutdown);
    }

    #[test]
    fn test_into_http_keeps_headers() {
        let mut response = Response::ok("1");
        response.headers_mut().append(
            axum::http::header::SET_COOKIE,
            axum::http::HeaderValue::from_static("JSESSIONID=x; Path=/"),
        );

        let http = into_http(response);
        assert_eq!(http.status(), StatusCode::OK);
        assert_eq!(
            http.headers().get(axum::http::header::SET_COOKIE).unwrap(),
            "JSESSIONID=x; Path=/"
        );
    }
}
