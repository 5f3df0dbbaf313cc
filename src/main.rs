//! session-router binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use session_router::cli::{self, Args};
use session_router::config::Config;
use session_router::deployment::{DeploymentConfig, Registry, SessionCounter};
use session_router::{logging, server};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(args)?;

    if logging::init_with_filter(config.log_filter()).is_err() {
        eprintln!("warning: logging already initialized");
    }

    info!("session-router v{}", env!("CARGO_PKG_VERSION"));

    let server_config = config.to_server_config()?;

    let registry = Arc::new(Registry::default());
    let mut deployment = DeploymentConfig::new(&config.deployment.context_path, SessionCounter)
        .with_session_timeout(config.idle_timeout())
        .with_cookie_config(config.cookie_config()?);
    if let Some(ref name) = config.deployment.name {
        deployment = deployment.with_name(name);
    }

    let handle = registry.add_deployment(deployment)?;
    registry.start(&handle)?;
    info!(
        deployment = %handle,
        cookie = %handle.session_cookie_config().name(),
        idle_timeout_secs = config.session.idle_timeout_secs,
        "deployment ready"
    );

    let sweeper = server::spawn_sweeper(Arc::clone(&registry), config.sweep_interval());
    let result = server::serve(server_config, Arc::new(registry.chain())).await;
    sweeper.abort();

    info!("session-router stopped");
    result.map_err(Into::into)
}
