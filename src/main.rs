use std::{net::SocketAddr, path::PathBuf, process::ExitCode};

use clap::Parser;
use entitlement_gate::{
    AppState, build_app,
    config::AppConfig,
    observability::{TracingGuard, init_tracing},
};

const DEFAULT_CONFIG_PATH: &str = "entitlement-gate.toml";

/// CLI arguments for the entitlement gate
#[derive(Parser, Debug)]
#[command(version, about = "Entitlement server request authentication gate", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./entitlement-gate.toml if it exists,
    /// otherwise every strategy is disabled and all requests are anonymous)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Validate the config file and print the resolved provider chain
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Check => run_check(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(
    explicit: Option<&std::path::Path>,
) -> Result<AppConfig, entitlement_gate::config::ConfigError> {
    if let Some(path) = explicit {
        return AppConfig::from_file(path);
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default.exists() {
        AppConfig::from_file(&default)
    } else {
        Ok(AppConfig::default())
    }
}

fn run_check(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let user_service = config.user_service.kind();
    let state = AppState::from_config(config)?;
    let chain = state.interceptor.provider_names();

    println!("Configuration OK");
    println!("  user_service: {user_service}");
    if chain.is_empty() {
        println!("  providers:    (none, all requests are anonymous)");
    } else {
        println!("  providers:    {}", chain.join(" -> "));
    }
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let _tracing_guard: TracingGuard = init_tracing(&config.observability)?;

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = AppState::from_config(config)?;

    tracing::info!(
        providers = ?state.interceptor.provider_names(),
        user_service = state.config.user_service.kind(),
        "Authentication chain ready"
    );

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
