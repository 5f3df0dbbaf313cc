//! Command-line interface for session-router.
//!
//! Every flag is optional so that unset flags leave file and environment
//! values in place.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Session cookie name.
    pub cookie_name: Option<String>,
    /// Session idle timeout in seconds.
    pub idle_timeout: Option<u64>,
    /// Context path of the served deployment.
    pub context_path: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                let host = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("host", value))?;
                result.host = Some(host);
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                let port = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("port", value))?;
                result.port = Some(port);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('n') | Long("cookie-name") => {
                let value: String = parser.value()?.parse()?;
                if !crate::cookie::codec::is_token(&value) {
                    return Err(ArgsError::InvalidValue("cookie-name", value));
                }
                result.cookie_name = Some(value);
            }
            Short('t') | Long("idle-timeout") => {
                let value: String = parser.value()?.parse()?;
                let secs = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("idle-timeout", value))?;
                result.idle_timeout = Some(secs);
            }
            Short('x') | Long("context-path") => {
                result.context_path = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"session-router {version}
HTTP request dispatch with cookie-based session affinity

USAGE:
    session-router [OPTIONS]

OPTIONS:
    -H, --host <ADDR>           Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>           Port to listen on [default: 8080]
    -c, --config <FILE>         Path to configuration file (JSON)
    -n, --cookie-name <NAME>    Session cookie name [default: JSESSIONID]
    -t, --idle-timeout <SECS>   Session idle timeout [default: 1800]
    -x, --context-path <PATH>   Context path of the deployment [default: /servletContext]
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT VARIABLES:
    SESSION_ROUTER_HOST          Host address (overrides config)
    SESSION_ROUTER_PORT          Port number (overrides config)
    SESSION_ROUTER_COOKIE_NAME   Session cookie name (overrides config)
    SESSION_ROUTER_IDLE_TIMEOUT  Idle timeout in seconds (overrides config)
    SESSION_ROUTER_LOG_LEVEL     Log level (overrides config)
    RUST_LOG                     Alternative log level setting

EXAMPLES:
    # Serve the session counter at localhost:8080/servletContext
    session-router

    # Custom cookie name and a short idle timeout
    session-router -n MySessionCookie -t 60

    # Start with config file
    session-router -c /etc/session-router/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("session-router {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("session-router")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.host.is_none());
        assert!(result.port.is_none());
        assert!(result.cookie_name.is_none());
        assert!(!result.help);
    }

    #[test]
    fn test_host_port() {
        let result = parse_args_from(args(&["-H", "0.0.0.0", "-p", "8080"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
        assert_eq!(result.port, Some(8080));
    }

    #[test]
    fn test_session_options() {
        let result = parse_args_from(args(&[
            "--cookie-name",
            "MySessionCookie",
            "--idle-timeout",
            "60",
            "--context-path",
            "/shop",
        ]))
        .unwrap();
        assert_eq!(result.cookie_name.as_deref(), Some("MySessionCookie"));
        assert_eq!(result.idle_timeout, Some(60));
        assert_eq!(result.context_path.as_deref(), Some("/shop"));
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["-c", "/etc/config.json"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/config.json")));
    }

    #[test]
    fn test_help_and_version_flags() {
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_args_from(args(&["-p", "invalid"])).is_err());
        assert!(parse_args_from(args(&["-H", "not-an-ip"])).is_err());
        assert!(parse_args_from(args(&["-t", "-5"])).is_err());

        let err = parse_args_from(args(&["-n", "bad;name"])).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for --cookie-name: 'bad;name'");
    }

    #[test]
    fn test_unexpected_positional() {
        let err = parse_args_from(args(&["extra"])).unwrap_err();
        assert!(matches!(err, ArgsError::UnexpectedArgument(_)));
    }
}
