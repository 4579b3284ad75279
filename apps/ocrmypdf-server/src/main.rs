//! OCRmyPDF Server
//!
//! Accepts PDF uploads over HTTP and returns them with a searchable
//! English/Chinese text layer added by ocrmypdf.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocrmypdf_server::config::Config;
use ocrmypdf_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocrmypdf_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting OCRmyPDF Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        max_upload_bytes = config.ocr.max_upload_bytes,
        max_pages = config.ocr.max_pages,
        timeout_secs = config.ocr.timeout_secs,
        jobs = config.ocr.jobs,
        "OCR limits"
    );

    let app_state = AppState::new(config.clone());

    let versions = app_state.processor().versions().await;
    match &versions.ocrmypdf {
        Some(version) => tracing::info!("ocrmypdf {}", version),
        None => tracing::warn!(
            "ocrmypdf not runnable at '{}'; OCR requests will fail",
            config.ocr.ocrmypdf_path
        ),
    }
    if let Some(version) = &versions.tesseract {
        tracing::info!("{}", version);
    }

    let app = ocrmypdf_server::app(app_state);

    // Start server with graceful shutdown
    let ip: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid HOST '{}'", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    tracing::info!("OCRmyPDF Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
