use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::cors::CorsLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::info;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

mod config;
mod handlers;
mod metrics;
mod socket;

use transfer_relay::TransferRelay;

use crate::config::{DroplineConfig, FileConfig, ServerConfig};
use crate::metrics::RelayMetrics;

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Parser)]
#[command(name = "dropline")]
#[command(about = "Pairing relay for browser-to-browser file transfers")]
struct Cli {
    /// Host to bind to (overrides config file)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the server (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Custom data directory (defaults to ~/.dropline)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone)]
pub(crate) struct AppState {
    /// The pairing relay engine
    pub relay: Arc<TransferRelay>,
    /// Server runtime configuration
    pub server_config: Arc<ServerConfig>,
    /// Relay metrics for observability
    pub metrics: Arc<RelayMetrics>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_directive = if cli.debug {
        "dropline=debug,transfer_relay=debug,tower_http=debug,info"
    } else {
        "dropline=info,transfer_relay=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting Dropline - file transfer pairing relay");

    let config = DroplineConfig::new(cli.data_dir)?;

    let file_config: FileConfig = config::load_config(&config.data_dir)
        .extract()
        .context("Failed to load configuration")?;

    let host = cli.host.unwrap_or_else(|| file_config.server.host.clone());
    let port = cli.port.unwrap_or(file_config.server.port);

    let server_config = Arc::new(ServerConfig::from_file(&file_config));
    info!(
        "Server config: send_channel_capacity={}",
        server_config.websocket.send_channel_capacity
    );

    let app_state = AppState {
        relay: Arc::new(TransferRelay::new()),
        server_config,
        metrics: Arc::new(RelayMetrics::new()),
    };

    // Build routes
    let app = Router::new()
        // Transfer session routes
        .route("/api/transfer/init", post(handlers::init_transfer_handler))
        .route(
            "/api/transfer/{token}/status",
            get(handlers::transfer_status_handler),
        )
        // WebSocket endpoints: one per transport capability
        .route("/transfer/ws", get(handlers::native_websocket_handler))
        .route(
            "/transfer/fallback",
            get(handlers::fallback_websocket_handler),
        )
        // Health endpoints
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = format!("{}:{}", host, port)
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Dropline listening on http://{}", actual_addr);
    info!("API endpoints:");
    info!("  POST /api/transfer/init          - Create a transfer token");
    info!("  GET  /api/transfer/:token/status - Pairing and queue status");
    info!("  GET  /transfer/ws                - WebSocket (native binary)");
    info!("  GET  /transfer/fallback          - WebSocket (base64 text fallback)");

    // Create shutdown signal handler
    let shutdown_signal = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}
