//! Request Validator
//!
//! Turns raw multipart fields into an [`OcrJobRequest`]. Validation is pure:
//! nothing is written to disk and no process is started, so a rejected
//! request never costs a workspace.

use axum::body::Bytes;

use super::types::{Language, OcrJobRequest, OcrOptions, OptimizeLevel, UploadedPdf, ValidationError};

/// PDF readers accept the header anywhere in the first kilobyte
const PDF_HEADER_WINDOW: usize = 1024;
const PDF_MAGIC: &[u8] = b"%PDF-";

/// File part of the form as received
#[derive(Debug, Clone, Default)]
pub struct RawUpload {
    pub filename: Option<String>,
    pub data: Bytes,
}

/// Form fields exactly as received, before any checks
#[derive(Debug, Clone, Default)]
pub struct RawOcrForm {
    pub file: Option<RawUpload>,
    pub language: Option<String>,
    pub force_ocr: Option<String>,
    pub deskew: Option<String>,
    pub optimize: Option<String>,
    pub skip_text: Option<String>,
}

/// Validate a raw form against the upload limit.
///
/// Checks run in a fixed order (file, size, language, optimize level,
/// booleans) and the first violation is returned.
pub fn validate(form: RawOcrForm, max_upload_bytes: u64) -> Result<OcrJobRequest, ValidationError> {
    let upload = form.file.ok_or(ValidationError::MissingFile)?;

    let filename = upload
        .filename
        .filter(|name| !name.trim().is_empty())
        .ok_or(ValidationError::MissingFile)?;

    if !has_pdf_extension(&filename) {
        return Err(ValidationError::InvalidFileType(filename));
    }

    if !has_pdf_signature(&upload.data) {
        return Err(ValidationError::NotPdf);
    }

    if upload.data.len() as u64 > max_upload_bytes {
        return Err(ValidationError::FileTooLarge {
            max: max_upload_bytes,
        });
    }

    let language = match non_empty(form.language) {
        Some(value) => value.parse::<Language>()?,
        None => Language::default(),
    };

    let optimize = match non_empty(form.optimize) {
        Some(value) => value.parse::<OptimizeLevel>()?,
        None => OptimizeLevel::default(),
    };

    let force_ocr = parse_flag("force_ocr", form.force_ocr)?;
    let deskew = parse_flag("deskew", form.deskew)?;
    let skip_text = parse_flag("skip_text", form.skip_text)?;

    Ok(OcrJobRequest {
        source: UploadedPdf {
            filename,
            data: upload.data,
        },
        options: OcrOptions {
            language,
            force_ocr,
            deskew,
            optimize,
            skip_text,
        },
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn has_pdf_extension(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

/// Check for the `%PDF-` header within the first kilobyte
pub fn has_pdf_signature(data: &[u8]) -> bool {
    let window = &data[..data.len().min(PDF_HEADER_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

/// Parse a form boolean the way HTML forms and API clients send them
fn parse_flag(field: &'static str, value: Option<String>) -> Result<bool, ValidationError> {
    let Some(raw) = non_empty(value) else {
        return Ok(false);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ValidationError::InvalidBoolean { field, value: raw }),
    }
}
