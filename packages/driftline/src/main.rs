use anyhow::{Context, Result};
use axum::{Router, routing::get};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::info;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

mod blob_store;
mod config;
mod handlers;
mod hub;
mod metrics;

use crate::blob_store::BlobStore;
use crate::config::{DriftConfig, FileConfig};
use crate::metrics::ServerMetrics;

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
#[command(name = "drift")]
#[command(about = "Real-time broadcast hub with file relay")]
struct Cli {
    /// Port for the server (overrides config.toml / DRIFT_SERVER__PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Custom data directory (defaults to ~/.driftline)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub hub: Arc<hub::Hub>,
    pub blob_store: Arc<BlobStore>,
    pub metrics: Arc<ServerMetrics>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_directive = if cli.debug {
        "driftline=debug,tower_http=debug,info"
    } else {
        "driftline=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting Driftline - broadcast hub");

    let config = Arc::new(DriftConfig::new(cli.data_dir.clone())?);

    let file_config: FileConfig = config::load_config(&config.data_dir)
        .extract()
        .context("Failed to load configuration")?;

    let host = cli.host.unwrap_or(file_config.server.host);
    let port = cli.port.unwrap_or(file_config.server.port);

    // Initialize metrics and the hub
    let metrics = Arc::new(ServerMetrics::new());
    let hub = Arc::new(hub::Hub::new(metrics.clone()));

    // Initialize upload storage
    let blob_store = Arc::new(
        BlobStore::new(&config.uploads_dir).context("Failed to initialize upload storage")?,
    );
    info!("Uploads directory: {}", blob_store.root().display());

    let app_state = AppState {
        hub,
        blob_store: blob_store.clone(),
        metrics,
    };

    // Build routes
    let app = Router::new()
        .route("/ws", get(handlers::websocket_handler))
        // Health endpoints
        .route("/health", get(handlers::health_handler))
        .route("/health/live", get(handlers::health_live_handler))
        .route("/metrics", get(handlers::metrics_handler))
        // Stored uploads, served back by name
        .nest_service("/uploads", ServeDir::new(blob_store.root()))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = format!("{}:{}", host, port).parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Driftline listening on http://{}", actual_addr);
    info!("  GET /ws       - hub channel (WebSocket)");
    info!("  GET /uploads  - stored file retrieval");
    info!("  GET /health   - server status");

    // Create shutdown signal handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received shutdown signal, cleaning up...");
    };

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}
