// ABOUTME: Entry point for the kiosk control plane.
// ABOUTME: Parses arguments, wires the backend and orchestrator, serves HTTP.

mod cli;

use std::env;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use kiosk::api::{self, AppState};
use kiosk::backend;
use kiosk::config::{self, Config};
use kiosk::error::{Error, Result};
use kiosk::lifecycle::SiteManager;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, force)
        }
        Commands::Serve { listen } => {
            let cwd = env::current_dir()?;
            let mut config = Config::discover(&cwd)?;

            if let Some(listen) = listen {
                config.listen = listen;
            }

            serve(config).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let backend = backend::create_backend(&config)?;
    backend
        .preflight()
        .await
        .map_err(|e| Error::Engine(e.to_string()))?;

    let sites = Arc::new(SiteManager::new(backend, config.run_timeout));
    let app = api::router(AppState { sites });

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!(
        listen = %config.listen,
        project = %config.project,
        region = %config.region,
        "kiosk control plane listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to listen for shutdown signal");
    }
}
