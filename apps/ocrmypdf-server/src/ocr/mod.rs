//! OCR Module
//!
//! Adds a searchable text layer to uploaded PDFs by running ocrmypdf.
//!
//! A request flows through three stages:
//! - [`validator`]: checks the raw form and builds an [`OcrJobRequest`]
//! - [`job`]: owns the per-request workspace, limits and timeout
//! - [`processor`]: builds the ocrmypdf command line and captures its result
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocrmypdf_server::ocr::{validate, OcrJobRunner, OcrMyPdf, OcrMyPdfConfig};
//!
//! let processor = Arc::new(OcrMyPdf::new(OcrMyPdfConfig::from(&config.ocr)));
//! let runner = OcrJobRunner::new(Arc::new(config.ocr.clone()), processor);
//!
//! let request = validate(form, config.ocr.max_upload_bytes)?;
//! let output = runner.run(request).await?;
//! // output.data contains the OCRed PDF
//! ```

pub mod job;
pub mod pages;
pub mod processor;
pub mod types;
pub mod validator;

pub use job::{download_filename, JobWorkspace, OcrJobRunner};
pub use processor::{
    OcrError, OcrMyPdf, OcrMyPdfConfig, OcrProcessor, ProcessOutcome, ProcessStatus, ToolVersions,
};
pub use types::{
    Language, OcrJobRequest, OcrOptions, OcrOutput, OptimizeLevel, UploadedPdf, ValidationError,
};
pub use validator::{validate, RawOcrForm, RawUpload};
