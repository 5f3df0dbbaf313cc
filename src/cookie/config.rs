//! Per-deployment session cookie configuration.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::codec;
use crate::error::RouterError;
use crate::Result;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "JSESSIONID";

/// Plain snapshot of session cookie attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    /// Cookie name carrying the session identifier.
    pub name: String,
    /// Cookie path. `None` means the deployment's context path.
    pub path: Option<String>,
    /// Cookie domain.
    pub domain: Option<String>,
    /// Max-Age in seconds. `None` makes a browser-session cookie.
    pub max_age: Option<u64>,
    /// Emit the `Secure` flag.
    pub secure: bool,
    /// Emit the `HttpOnly` flag.
    pub http_only: bool,
    /// Re-emit `Set-Cookie` on every resolved request, not only on creation.
    pub refresh_on_access: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            path: None,
            domain: None,
            max_age: None,
            secure: false,
            http_only: true,
            refresh_on_access: false,
        }
    }
}

/// Shared, mutable session cookie configuration for one deployment.
///
/// Clones share the same underlying settings, so the application can keep
/// a handle and rename the cookie while the deployment is serving. Every
/// `Set-Cookie` emitted after a change uses the new values.
#[derive(Debug, Clone, Default)]
pub struct SessionCookieConfig {
    inner: Arc<RwLock<CookieSettings>>,
}

impl SessionCookieConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config from explicit settings.
    ///
    /// Fails if the cookie name is not a valid token, or if the path or
    /// domain contains anything but visible ASCII other than `;`.
    pub fn from_settings(settings: CookieSettings) -> Result<Self> {
        if !codec::is_token(&settings.name) {
            return Err(RouterError::InvalidCookieName(settings.name));
        }
        check_attribute("path", settings.path.as_deref())?;
        check_attribute("domain", settings.domain.as_deref())?;
        Ok(Self {
            inner: Arc::new(RwLock::new(settings)),
        })
    }

    // Settings are plain data, so a poisoned lock still holds a usable value.
    fn read(&self) -> RwLockReadGuard<'_, CookieSettings> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CookieSettings> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> CookieSettings {
        self.read().clone()
    }

    /// Current cookie name.
    pub fn name(&self) -> String {
        self.read().name.clone()
    }

    /// Rename the session cookie.
    pub fn set_name(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if !codec::is_token(&name) {
            return Err(RouterError::InvalidCookieName(name));
        }
        tracing::debug!(cookie = %name, "session cookie renamed");
        self.write().name = name;
        Ok(())
    }

    pub fn path(&self) -> Option<String> {
        self.read().path.clone()
    }

    /// Set the cookie `Path`. `None` restores the context-path default.
    pub fn set_path(&self, path: Option<String>) -> Result<()> {
        check_attribute("path", path.as_deref())?;
        self.write().path = path;
        Ok(())
    }

    pub fn domain(&self) -> Option<String> {
        self.read().domain.clone()
    }

    pub fn set_domain(&self, domain: Option<String>) -> Result<()> {
        check_attribute("domain", domain.as_deref())?;
        self.write().domain = domain;
        Ok(())
    }

    pub fn max_age(&self) -> Option<u64> {
        self.read().max_age
    }

    pub fn set_max_age(&self, max_age: Option<u64>) {
        self.write().max_age = max_age;
    }

    pub fn is_secure(&self) -> bool {
        self.read().secure
    }

    pub fn set_secure(&self, secure: bool) {
        self.write().secure = secure;
    }

    pub fn is_http_only(&self) -> bool {
        self.read().http_only
    }

    pub fn set_http_only(&self, http_only: bool) {
        self.write().http_only = http_only;
    }

    pub fn refresh_on_access(&self) -> bool {
        self.read().refresh_on_access
    }

    pub fn set_refresh_on_access(&self, refresh: bool) {
        self.write().refresh_on_access = refresh;
    }
}

fn check_attribute(attribute: &'static str, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) if !codec::is_attribute_value(value) => {
            Err(RouterError::InvalidCookieAttribute {
                attribute,
                value: value.to_string(),
            })
        }
        _ => Ok(()),
    }
}
