//! tq-mr - Track Metadata Resolver Service
//!
//! Sits between the browser game UI and the backing download-job server:
//! seeds a per-session track registry from a playlist, polls for newly
//! downloaded tracks, resolves each raw title against the release
//! catalog (with a generative fallback) and republishes track state over
//! HTTP + SSE.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tq_mr::config::ServiceConfig;
use tq_mr::AppState;

/// Track metadata resolver service
#[derive(Parser)]
#[command(name = "tq-mr", version)]
struct Args {
    /// Path to a TOML config file (default: ~/.config/trackquiz/tq-mr.toml)
    #[arg(long)]
    config: Option<String>,

    /// HTTP API listen port
    #[arg(long)]
    port: Option<u16>,

    /// Base URL of the backing download-job server
    #[arg(long)]
    job_server_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = tq_common::config::load_toml_config("tq-mr", args.config.as_deref())?;

    // Initialize tracing before config resolution so resolution warnings
    // (e.g. missing fallback key) are visible
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServiceConfig::resolve(args.port, args.job_server_url.as_deref(), &toml_config);

    info!("Starting tq-mr (Track Metadata Resolver)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Job server: {}", config.job_server_url);
    info!("Catalog: {}", config.catalog_url);

    let state = AppState::new(&config)?;
    let app = tq_mr::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
