//! OCR Job Orchestrator
//!
//! Runs one validated request end to end: workspace, page-count pre-check,
//! ocrmypdf under a deadline, output verification. Every failure after
//! validation is converted into an [`ApiError`] here, and the workspace is
//! gone by the time [`OcrJobRunner::run`] returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::Instrument;
use uuid::Uuid;

use super::pages::count_pages;
use super::processor::{describe_exit_code, OcrProcessor, ProcessStatus};
use super::types::{OcrJobRequest, OcrOutput, ValidationError};
use crate::config::OcrConfig;
use crate::error::ApiError;

const WORKSPACE_PREFIX: &str = "ocr-job-";
const INPUT_FILENAME: &str = "input.pdf";
const OUTPUT_FILENAME: &str = "output.pdf";
const FALLBACK_DOWNLOAD_NAME: &str = "processed_document.pdf";

/// Scoped, uniquely named directory owned by a single job.
///
/// Dropping the handle removes the directory and everything in it, so the
/// workspace is released on every exit path, including cancellation.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh workspace under `parent` (or the system temp dir)
    pub fn acquire(parent: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join(INPUT_FILENAME)
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_FILENAME)
    }

    /// Remove the workspace now, off the async executor, logging failures
    pub async fn release(self) {
        let path = self.dir.path().to_path_buf();
        let dir = self.dir;
        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => tracing::debug!(path = %path.display(), "Workspace removed"),
            Ok(Err(e)) => {
                tracing::error!(path = %path.display(), "Failed to remove workspace: {}", e)
            }
            Err(e) => tracing::error!(path = %path.display(), "Workspace cleanup task failed: {}", e),
        }
    }
}

/// Runs OCR jobs against a processor with the configured limits
#[derive(Clone)]
pub struct OcrJobRunner {
    config: Arc<OcrConfig>,
    processor: Arc<dyn OcrProcessor>,
}

impl OcrJobRunner {
    pub fn new(config: Arc<OcrConfig>, processor: Arc<dyn OcrProcessor>) -> Self {
        Self { config, processor }
    }

    pub fn processor(&self) -> &Arc<dyn OcrProcessor> {
        &self.processor
    }

    /// Process a validated request
    pub async fn run(&self, request: OcrJobRequest) -> Result<OcrOutput, ApiError> {
        let job_id = Uuid::new_v4();
        let span = tracing::info_span!("ocr_job", %job_id);

        let result = self.run_job(request).instrument(span.clone()).await;

        let _enter = span.enter();
        match &result {
            Ok(output) => tracing::info!(
                bytes = output.data.len(),
                elapsed_ms = output.elapsed.as_millis() as u64,
                "Job succeeded"
            ),
            Err(ApiError::Timeout { .. }) => tracing::warn!("Job timed out"),
            Err(e) => tracing::warn!("Job failed: {}", e),
        }
        result
    }

    async fn run_job(&self, request: OcrJobRequest) -> Result<OcrOutput, ApiError> {
        let workspace = JobWorkspace::acquire(self.config.work_dir.as_deref())
            .map_err(|e| ApiError::Internal(format!("Failed to create job workspace: {}", e)))?;
        tracing::info!(path = %workspace.path().display(), "Processing in temporary directory");

        let result = self.run_in(&workspace, request).await;
        workspace.release().await;
        result
    }

    async fn run_in(
        &self,
        workspace: &JobWorkspace,
        request: OcrJobRequest,
    ) -> Result<OcrOutput, ApiError> {
        let OcrJobRequest { source, options } = request;
        let input_path = workspace.input_path();
        let output_path = workspace.output_path();

        tracing::info!(
            filename = %source.filename,
            size = source.size(),
            "Saving uploaded file"
        );
        tokio::fs::write(&input_path, &source.data)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to write input PDF: {}", e)))?;

        let pages = self.check_page_count(&input_path).await?;

        let timeout = self.config.timeout();
        let outcome = match tokio::time::timeout(
            timeout,
            self.processor.process(&input_path, &output_path, &options),
        )
        .await
        {
            Ok(outcome) => outcome.map_err(|e| ApiError::Internal(e.to_string()))?,
            Err(_) => {
                tracing::error!(
                    filename = %source.filename,
                    "OCR processing timed out after {} seconds",
                    timeout.as_secs()
                );
                return Err(ApiError::Timeout {
                    seconds: timeout.as_secs(),
                });
            }
        };

        match outcome.status() {
            ProcessStatus::Success => {}
            ProcessStatus::PriorOcrFound => {
                tracing::info!("Input already has a text layer");
                return Err(ApiError::AlreadyHasText);
            }
            ProcessStatus::Failed { exit_code } => {
                tracing::error!(
                    exit_code,
                    reason = describe_exit_code(exit_code),
                    stderr = %outcome.stderr,
                    stdout = %outcome.stdout,
                    "ocrmypdf failed"
                );
                return Err(ApiError::ToolFailure {
                    exit_code,
                    reason: describe_exit_code(exit_code),
                    diagnostics: outcome.stderr,
                });
            }
        }

        let data = match tokio::fs::read(&output_path).await {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => return Err(missing_output("OCR command succeeded but the output file is empty")),
            Err(e) => {
                tracing::error!("Failed to read output PDF: {}", e);
                return Err(missing_output(
                    "OCR command succeeded but the output file was not found",
                ));
            }
        };

        Ok(OcrOutput {
            data,
            filename: download_filename(&source.filename),
            pages,
            elapsed: outcome.elapsed,
        })
    }

    /// Enforce the page limit when the PDF can be parsed.
    ///
    /// Files the parser cannot read are passed through; ocrmypdf is more
    /// forgiving and reports its own input errors.
    async fn check_page_count(&self, input_path: &Path) -> Result<Option<usize>, ApiError> {
        match count_pages(input_path).await {
            Ok(pages) if pages > self.config.max_pages => {
                Err(ApiError::Validation(ValidationError::TooManyPages {
                    pages,
                    max: self.config.max_pages,
                }))
            }
            Ok(pages) => {
                tracing::debug!(pages, "Page count within limit");
                Ok(Some(pages))
            }
            Err(e) => {
                tracing::warn!("Skipping page count check: {}", e);
                Ok(None)
            }
        }
    }
}

fn missing_output(message: &str) -> ApiError {
    tracing::error!("{}", message);
    ApiError::ToolFailure {
        exit_code: Some(0),
        reason: describe_exit_code(Some(0)),
        diagnostics: message.to_string(),
    }
}

/// Download name for the processed file: `ocr_<original name>`
pub fn download_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(|c| c == '.' || c == '_' || c == ' ').is_empty() {
        FALLBACK_DOWNLOAD_NAME.to_string()
    } else {
        format!("ocr_{}", sanitized)
    }
}
