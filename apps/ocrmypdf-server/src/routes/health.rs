//! Health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ocr::Language;
use crate::state::AppState;

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub supported_languages: Vec<&'static str>,
    pub languages: Vec<LanguageInfo>,
}

#[derive(Serialize)]
pub struct LanguageInfo {
    pub code: Language,
    pub description: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub ocrmypdf: Option<String>,
    pub tesseract: Option<String>,
}

/// GET /
///
/// Liveness check that never touches external tools.
pub async fn root() -> Json<RootResponse> {
    let supported_languages = Language::codes();
    Json(RootResponse {
        message: format!(
            "OCRmyPDF API is running. Use POST /ocr/ to process PDFs. Supported languages: {}",
            supported_languages.join(", ")
        ),
        supported_languages,
        languages: Language::ALL
            .into_iter()
            .map(|code| LanguageInfo {
                code,
                description: code.description(),
            })
            .collect(),
    })
}

/// GET /health
///
/// Reports the external toolchain versions. The service is `degraded` when
/// ocrmypdf itself cannot be run.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let versions = state.processor().versions().await;
    let status = if versions.ocrmypdf.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        service: "ocrmypdf-server",
        ocrmypdf: versions.ocrmypdf,
        tesseract: versions.tesseract,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
