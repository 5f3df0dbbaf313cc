//! Session counter application.

use serde_json::Value;

use super::{Application, Exchange};
use crate::handler::{Request, Response};
use crate::Result;

/// Session attribute holding the request count.
pub const COUNT_ATTRIBUTE: &str = "count";

/// Counts requests per session and answers with the new count.
///
/// The first request in a session answers `1`, the next `2`, and so on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCounter;

impl Application for SessionCounter {
    fn service(&self, _request: &Request, exchange: &mut Exchange<'_>) -> Result<Response> {
        let session = exchange.session()?;
        let count = session.with(|s| {
            let next = s
                .attribute(COUNT_ATTRIBUTE)
                .and_then(Value::as_u64)
                .unwrap_or(0)
                + 1;
            s.set_attribute(COUNT_ATTRIBUTE, next);
            next
        })?;

        Ok(Response::ok(count.to_string()))
    }
}
