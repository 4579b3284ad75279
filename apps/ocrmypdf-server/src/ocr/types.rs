//! OCR Types
//!
//! Defines the validated job request, its options and the validation errors
//! that reject a request before any work is done.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::Serialize;

/// OCR language argument passed to ocrmypdf (`-l`).
///
/// Tesseract combines language models with `+`; digits are handled by every
/// model so no separate option exists for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Language {
    #[serde(rename = "eng")]
    English,
    #[serde(rename = "chi_sim")]
    SimplifiedChinese,
    #[serde(rename = "eng+chi_sim")]
    EnglishAndSimplifiedChinese,
}

impl Language {
    /// Every supported language, in display order
    pub const ALL: [Language; 3] = [
        Language::English,
        Language::SimplifiedChinese,
        Language::EnglishAndSimplifiedChinese,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "eng",
            Self::SimplifiedChinese => "chi_sim",
            Self::EnglishAndSimplifiedChinese => "eng+chi_sim",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::English => "English only",
            Self::SimplifiedChinese => "Simplified Chinese only",
            Self::EnglishAndSimplifiedChinese => "English and Simplified Chinese",
        }
    }

    pub fn codes() -> Vec<&'static str> {
        Self::ALL.iter().map(Language::as_str).collect()
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::EnglishAndSimplifiedChinese
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnsupportedLanguage(s.to_string()))
    }
}

/// ocrmypdf optimization level: 0 (none) through 3 (maximum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OptimizeLevel(u8);

impl OptimizeLevel {
    pub const MAX: u8 = 3;

    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX).then_some(Self(level))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl FromStr for OptimizeLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ValidationError::InvalidOptimizeLevel(s.to_string()))
    }
}

/// Options that shape a single ocrmypdf invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrOptions {
    pub language: Language,
    /// Rasterize and OCR every page, replacing any existing text
    pub force_ocr: bool,
    /// Straighten pages before recognition
    pub deskew: bool,
    pub optimize: OptimizeLevel,
    /// Leave pages that already have text untouched instead of failing
    pub skip_text: bool,
}

/// Uploaded PDF held in memory until the job persists it
#[derive(Debug, Clone)]
pub struct UploadedPdf {
    pub filename: String,
    pub data: Bytes,
}

impl UploadedPdf {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A request that passed validation and is ready to be processed
#[derive(Debug, Clone)]
pub struct OcrJobRequest {
    pub source: UploadedPdf,
    pub options: OcrOptions,
}

/// Successful job output
#[derive(Debug)]
pub struct OcrOutput {
    /// OCRed PDF data
    pub data: Vec<u8>,
    /// Suggested download filename
    pub filename: String,
    /// Page count from the pre-check, when the input could be parsed
    pub pages: Option<usize>,
    /// Time spent inside ocrmypdf
    pub elapsed: Duration,
}

/// Reasons a request is rejected before any processing happens
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No file uploaded. Send the PDF in the 'pdf_file' form field.")]
    MissingFile,

    #[error("Invalid file type '{0}'. Please upload a PDF file.")]
    InvalidFileType(String),

    #[error("Uploaded file is not a PDF document")]
    NotPdf,

    #[error("File exceeds the maximum upload size of {} MB", .max / (1024 * 1024))]
    FileTooLarge { max: u64 },

    #[error("Unsupported language '{0}'. Choose from: eng, chi_sim, eng+chi_sim")]
    UnsupportedLanguage(String),

    #[error("Invalid optimize level '{0}'. Expected 0, 1, 2 or 3")]
    InvalidOptimizeLevel(String),

    #[error("Invalid boolean '{value}' for '{field}'. Expected true or false")]
    InvalidBoolean { field: &'static str, value: String },

    #[error("PDF has {pages} pages, more than the maximum of {max}")]
    TooManyPages { pages: usize, max: usize },

    #[error("Malformed multipart form: {0}")]
    MalformedForm(String),
}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedLanguage(_)
            | Self::InvalidOptimizeLevel(_)
            | Self::InvalidBoolean { .. }
            | Self::TooManyPages { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFile => "MISSING_FILE",
            Self::InvalidFileType(_) => "INVALID_FILE_TYPE",
            Self::NotPdf => "NOT_A_PDF",
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::UnsupportedLanguage(_) => "UNSUPPORTED_LANGUAGE",
            Self::InvalidOptimizeLevel(_) => "INVALID_OPTIMIZE_LEVEL",
            Self::InvalidBoolean { .. } => "INVALID_BOOLEAN",
            Self::TooManyPages { .. } => "TOO_MANY_PAGES",
            Self::MalformedForm(_) => "MALFORMED_FORM",
        }
    }

    /// Form field the error refers to
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingFile
            | Self::InvalidFileType(_)
            | Self::NotPdf
            | Self::FileTooLarge { .. }
            | Self::TooManyPages { .. } => Some("pdf_file"),
            Self::UnsupportedLanguage(_) => Some("language"),
            Self::InvalidOptimizeLevel(_) => Some("optimize"),
            Self::InvalidBoolean { field, .. } => Some(*field),
            Self::MalformedForm(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes_round_trip() {
        for lang in Language::ALL {
            assert_eq!(lang.as_str().parse::<Language>().unwrap(), lang);
        }
        assert_eq!(Language::codes(), vec!["eng", "chi_sim", "eng+chi_sim"]);
    }

    #[test]
    fn test_default_language_is_mixed() {
        assert_eq!(Language::default().as_str(), "eng+chi_sim");
    }

    #[test]
    fn test_unsupported_language() {
        let err = "fra".parse::<Language>().unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedLanguage(ref l) if l == "fra"));
        assert_eq!(err.field(), Some("language"));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_optimize_level_bounds() {
        assert_eq!("0".parse::<OptimizeLevel>().unwrap().get(), 0);
        assert_eq!(" 3 ".parse::<OptimizeLevel>().unwrap().get(), 3);
        assert!("4".parse::<OptimizeLevel>().is_err());
        assert!("-1".parse::<OptimizeLevel>().is_err());
        assert!("fast".parse::<OptimizeLevel>().is_err());
    }

    #[test]
    fn test_file_errors_are_bad_request() {
        assert_eq!(ValidationError::MissingFile.status_code(), StatusCode::BAD_REQUEST);
        let too_large = ValidationError::FileTooLarge { max: 200 * 1024 * 1024 };
        assert_eq!(too_large.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            too_large.to_string(),
            "File exceeds the maximum upload size of 200 MB"
        );
    }
}
