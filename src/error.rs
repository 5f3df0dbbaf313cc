//! Error types for session-router.

use thiserror::Error;

use crate::deployment::DeploymentState;

/// Main error type for session-router operations.
#[derive(Error, Debug)]
pub enum RouterError {
    /// A route prefix is already registered.
    #[error("path already registered: {0}")]
    Conflict(String),

    /// No registered route matches the path.
    #[error("no handler for path: {0}")]
    NotFound(String),

    /// A deployment already owns the context path.
    #[error("deployment already exists for context path: {0}")]
    DuplicateDeployment(String),

    /// Lifecycle operation attempted from the wrong state.
    #[error("cannot {action} deployment {context_path}: current state is {state:?}")]
    IllegalState {
        context_path: String,
        state: DeploymentState,
        action: &'static str,
    },

    /// Context path is empty or malformed.
    #[error("invalid context path: {0:?}")]
    InvalidContextPath(String),

    /// Cookie name is not a valid RFC 6265 token.
    #[error("invalid cookie name: {0:?}")]
    InvalidCookieName(String),

    /// Cookie attribute value would break the `Set-Cookie` header.
    #[error("invalid cookie {attribute}: {value:?}")]
    InvalidCookieAttribute {
        attribute: &'static str,
        value: String,
    },

    /// Handle does not refer to a registered deployment.
    #[error("unknown deployment: {0}")]
    UnknownDeployment(String),

    /// Session was invalidated while a request still held it.
    #[error("session invalidated: {0}")]
    SessionInvalidated(String),

    /// Identifier generation kept colliding with live sessions.
    #[error("session identifier space exhausted after {0} attempts")]
    IdSpaceExhausted(usize),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for session-router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RouterError::NotFound("/servletContextOther".into());
        assert!(err.to_string().contains("/servletContextOther"));
        assert!(err.to_string().contains("no handler"));
    }

    #[test]
    fn test_invalid_cookie_attribute_display() {
        let err = RouterError::InvalidCookieAttribute {
            attribute: "domain",
            value: "a;b".into(),
        };
        assert_eq!(err.to_string(), "invalid cookie domain: \"a;b\"");
    }

    #[test]
    fn test_conflict_display() {
        let err = RouterError::Conflict("/servletContext".into());
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_illegal_state_display() {
        let err = RouterError::IllegalState {
            context_path: "/app".into(),
            state: DeploymentState::Started,
            action: "start",
        };
        let msg = err.to_string();
        assert!(msg.contains("cannot start"));
        assert!(msg.contains("/app"));
        assert!(msg.contains("Started"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: RouterError = io_err.into();
        assert!(matches!(err, RouterError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }
}
