//! wavetrust-ta - Audio Trust Analysis Microservice
//!
//! Ingests an uploaded or remotely-fetched audio artifact, derives
//! signal-level heuristics, consults configured external classifiers, and
//! returns a bounded composite trust/risk score with a full breakdown.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wavetrust_ta::AppState;

#[derive(Debug, Parser)]
#[command(name = "wavetrust-ta", about = "Audio trust analysis service")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, env = "WAVETRUST_TA_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long, env = "WAVETRUST_TA_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting wavetrust-ta (Trust Analysis) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = wavetrust_common::config::load_service_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(
        upstreams = config.upstreams.len(),
        sink = config.sink.is_some(),
        max_payload_bytes = config.limits.max_payload_bytes,
        "Configuration loaded"
    );

    let port = config.port;
    let state = AppState::from_config(config);
    let app = wavetrust_ta::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
