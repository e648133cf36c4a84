use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use toolgate_server::background::spawn_session_sweeper;
use toolgate_server::{build_router, AppState};

/// Session-scoped JSON-RPC tool gateway and chat server.
#[derive(Debug, Parser)]
#[command(name = "toolgate", version)]
struct Cli {
    /// Bind address, overrides the configured HOST.
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Listen port, overrides the configured PORT.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    toolgate_core::config::load_dotenv();
    let cli = Cli::parse();

    let mut config = toolgate_core::Config::from_env();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.log_summary();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config));
    let sweeper = spawn_session_sweeper(state.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("toolgate listening on http://{}", addr);
    info!("API docs at http://{}/docs", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}
