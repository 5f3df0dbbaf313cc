//! Configuration management for session-router.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::cookie::{codec, CookieSettings, SessionCookieConfig, DEFAULT_COOKIE_NAME};
use crate::error::RouterError;
use crate::server::ServerConfig;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Session and cookie configuration.
    pub session: SessionSection,
    /// The deployment served by the binary.
    pub deployment: DeploymentSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            graceful_shutdown: true,
        }
    }
}

/// Session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Idle time after which a session expires.
    pub idle_timeout_secs: u64,
    /// Period of the background expiry sweep.
    pub sweep_interval_secs: u64,
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Cookie `Path`; the context path when unset.
    pub cookie_path: Option<String>,
    /// Cookie `Domain`.
    pub cookie_domain: Option<String>,
    /// Cookie `Max-Age`; a browser-session cookie when unset.
    pub cookie_max_age_secs: Option<u64>,
    /// Re-send the session cookie on every response that touches the session.
    pub refresh_cookie_on_access: bool,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1800,
            sweep_interval_secs: 60,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_path: None,
            cookie_domain: None,
            cookie_max_age_secs: None,
            refresh_cookie_on_access: false,
            http_only: true,
            secure: false,
        }
    }
}

/// Deployment configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentSection {
    /// Path prefix the application is served under.
    pub context_path: String,
    /// Display name; the context path when unset.
    pub name: Option<String>,
}

impl Default for DeploymentSection {
    fn default() -> Self {
        Self {
            context_path: "/servletContext".to_string(),
            name: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SESSION_ROUTER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("SESSION_ROUTER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(name) = std::env::var("SESSION_ROUTER_COOKIE_NAME") {
            if !name.is_empty() {
                self.session.cookie_name = name;
            }
        }

        if let Ok(timeout) = std::env::var("SESSION_ROUTER_IDLE_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.session.idle_timeout_secs = secs;
            }
        }

        if let Ok(level) = std::env::var("SESSION_ROUTER_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref name) = args.cookie_name {
            self.session.cookie_name = name.clone();
        }

        if let Some(secs) = args.idle_timeout {
            self.session.idle_timeout_secs = secs;
        }

        if let Some(ref path) = args.context_path {
            self.deployment.context_path = path.clone();
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the HTTP server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port);
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// Build the deployment's session cookie configuration.
    pub fn cookie_config(&self) -> Result<SessionCookieConfig, ConfigError> {
        let session = &self.session;
        if !codec::is_token(&session.cookie_name) {
            return Err(ConfigError::InvalidCookieName(session.cookie_name.clone()));
        }

        let attributes = [
            ("cookie_path", &session.cookie_path),
            ("cookie_domain", &session.cookie_domain),
        ];
        for (field, value) in attributes {
            if let Some(value) = value {
                if !codec::is_attribute_value(value) {
                    return Err(ConfigError::InvalidCookieAttribute(field, value.clone()));
                }
            }
        }

        let settings = CookieSettings {
            name: session.cookie_name.clone(),
            path: session.cookie_path.clone(),
            domain: session.cookie_domain.clone(),
            max_age: session.cookie_max_age_secs,
            secure: session.secure,
            http_only: session.http_only,
            refresh_on_access: session.refresh_cookie_on_access,
        };

        SessionCookieConfig::from_settings(settings).map_err(|e| match e {
            RouterError::InvalidCookieAttribute { attribute, value } => {
                ConfigError::InvalidCookieAttribute(attribute, value)
            }
            _ => ConfigError::InvalidCookieName(session.cookie_name.clone()),
        })
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_secs.max(1))
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// Cookie name is not an RFC 6265 token.
    InvalidCookieName(String),
    /// Cookie path or domain would break the `Set-Cookie` header.
    InvalidCookieAttribute(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::InvalidCookieName(name) => write!(f, "invalid cookie name: '{}'", name),
            Self::InvalidCookieAttribute(field, value) => {
                write!(f, "invalid value for {}: {:?}", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
