//! Error types for the OCRmyPDF server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ocr::ValidationError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, ApiError>;

/// Every way an OCR request can fail
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("PDF already has a text layer. Set force_ocr=true to OCR it anyway, or skip_text=true to keep existing text.")]
    AlreadyHasText,

    #[error("OCR processing failed ({reason})")]
    ToolFailure {
        exit_code: Option<i32>,
        reason: &'static str,
        diagnostics: String,
    },

    #[error("OCR processing took too long and timed out after {seconds} seconds. Try with a smaller file or disable heavy options.")]
    Timeout { seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(e) => e.status_code(),
            Self::AlreadyHasText => StatusCode::BAD_REQUEST,
            Self::ToolFailure { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::AlreadyHasText => "ALREADY_HAS_TEXT",
            Self::ToolFailure { .. } => "OCR_FAILED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_seconds: Option<u64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = ErrorResponse {
            detail: self.to_string(),
            error: self.code(),
            field: None,
            exit_code: None,
            diagnostics: None,
            timeout_seconds: None,
        };

        match self {
            Self::Validation(e) => {
                tracing::warn!(field = e.field(), "Request rejected: {}", e);
                body.field = e.field();
            }
            Self::AlreadyHasText => {
                body.field = Some("force_ocr");
            }
            Self::ToolFailure {
                exit_code,
                diagnostics,
                ..
            } => {
                body.exit_code = exit_code;
                body.diagnostics = Some(diagnostics);
            }
            Self::Timeout { seconds } => {
                body.timeout_seconds = Some(seconds);
            }
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                body.detail =
                    "An unexpected server error occurred. Please check server logs.".to_string();
            }
        }

        (status, Json(body)).into_response()
    }
}
