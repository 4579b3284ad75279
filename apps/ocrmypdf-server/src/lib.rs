//! OCRmyPDF Server Library
//!
//! HTTP service that adds a searchable OCR text layer to uploaded PDFs by
//! running the external `ocrmypdf` tool. The binary in main.rs only loads
//! configuration and serves the router built by [`app`].
//!
//! # Modules
//!
//! - `config`: Environment configuration, read once at startup
//! - `ocr`: Validation, job orchestration and the ocrmypdf adapter
//! - `routes`: HTTP endpoints
//! - `error`: Error taxonomy and its HTTP mapping

pub mod config;
pub mod error;
pub mod ocr;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Room for the non-file form fields and multipart framing
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let body_limit = state
        .config()
        .ocr
        .max_upload_bytes
        .saturating_add(FORM_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::ocr::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
