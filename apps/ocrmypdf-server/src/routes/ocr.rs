//! OCR API endpoints
//!
//! Endpoints:
//! - GET /supported-languages/ - List accepted `language` values
//! - POST /ocr/ - Upload a PDF and receive it back with a text layer

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::ocr::{validate, Language, OcrOutput, RawOcrForm, RawUpload, ValidationError};
use crate::state::AppState;

/// Create the OCR router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/supported-languages/", get(supported_languages))
        .route("/supported-languages", get(supported_languages))
        .route("/ocr/", post(run_ocr))
        .route("/ocr", post(run_ocr))
}

/// GET /supported-languages/
async fn supported_languages() -> Json<Vec<&'static str>> {
    Json(Language::codes())
}

/// POST /ocr/
///
/// Multipart fields: `pdf_file` (required), `language`, `force_ocr`,
/// `deskew`, `optimize`, `skip_text`.
async fn run_ocr(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let max_upload_bytes = state.config().ocr.max_upload_bytes;
    tracing::debug!("Received OCR request");

    let multipart = multipart.map_err(|rejection| {
        tracing::warn!("Rejected non-multipart OCR request: {}", rejection);
        ValidationError::MalformedForm(rejection.body_text())
    })?;

    let form = read_form(multipart, max_upload_bytes).await?;
    let request = validate(form, max_upload_bytes)?;

    tracing::info!(
        filename = %request.source.filename,
        size = request.source.size(),
        language = %request.options.language,
        force_ocr = request.options.force_ocr,
        deskew = request.options.deskew,
        optimize = request.options.optimize.get(),
        skip_text = request.options.skip_text,
        "Accepted OCR request"
    );

    let output = state.jobs().run(request).await?;
    Ok(pdf_response(output))
}

/// Collect multipart fields, enforcing the upload cap while streaming
async fn read_form(mut multipart: Multipart, max_upload_bytes: u64) -> Result<RawOcrForm> {
    let mut form = RawOcrForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_upload_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "pdf_file" if form.file.is_none() => {
                form.file = Some(read_file(field, max_upload_bytes).await?);
            }
            "language" => form.language = Some(read_text(field, max_upload_bytes).await?),
            "force_ocr" => form.force_ocr = Some(read_text(field, max_upload_bytes).await?),
            "deskew" => form.deskew = Some(read_text(field, max_upload_bytes).await?),
            "optimize" => form.optimize = Some(read_text(field, max_upload_bytes).await?),
            "skip_text" => form.skip_text = Some(read_text(field, max_upload_bytes).await?),
            _ => tracing::debug!("Ignoring form field '{}'", name),
        }
    }

    Ok(form)
}

async fn read_file(mut field: Field<'_>, max_upload_bytes: u64) -> Result<RawUpload> {
    let filename = field.file_name().map(str::to_string);
    tracing::debug!(?filename, content_type = ?field.content_type(), "Receiving upload");

    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_upload_bytes))?
    {
        if (data.len() + chunk.len()) as u64 > max_upload_bytes {
            tracing::warn!(?filename, "Upload exceeds {} bytes", max_upload_bytes);
            return Err(ValidationError::FileTooLarge {
                max: max_upload_bytes,
            }
            .into());
        }
        data.extend_from_slice(&chunk);
    }

    Ok(RawUpload {
        filename,
        data: data.into(),
    })
}

async fn read_text(field: Field<'_>, max_upload_bytes: u64) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| multipart_error(e, max_upload_bytes).into())
}

fn multipart_error(
    error: axum::extract::multipart::MultipartError,
    max_upload_bytes: u64,
) -> ValidationError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::FileTooLarge {
            max: max_upload_bytes,
        }
    } else {
        tracing::warn!("Failed to read multipart field: {}", error);
        ValidationError::MalformedForm(error.body_text())
    }
}

fn pdf_response(output: OcrOutput) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", output.filename);

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (
                header::HeaderName::from_static("x-ocr-elapsed-ms"),
                output.elapsed.as_millis().to_string(),
            ),
        ],
        output.data,
    )
        .into_response();

    // Absent when the page pre-check could not parse the input
    if let Some(pages) = output.pages {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static("x-ocr-pages"), pages.into());
    }
    response
}
