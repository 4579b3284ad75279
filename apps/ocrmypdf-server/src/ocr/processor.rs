//! OCR Processor
//!
//! Runs ocrmypdf to embed a searchable text layer into a PDF file.
//!
//! ## Requirements
//!
//! - `ocrmypdf` must be installed and available in PATH (or configured)
//! - Tesseract with the `eng` and `chi_sim` language packs
//!
//! The processor never enforces a deadline itself. Callers wrap
//! [`OcrProcessor::process`] in a timeout; dropping the future kills the
//! whole ocrmypdf process group, including tesseract and ghostscript
//! children.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use super::types::OcrOptions;

/// ocrmypdf exit code for success
pub const EXIT_OK: i32 = 0;
/// ocrmypdf exit code for `PriorOcrFoundError` (page already has text)
pub const EXIT_ALREADY_DONE_OCR: i32 = 6;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors starting or waiting on an external tool
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for {tool}: {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// How an ocrmypdf run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Success,
    /// The input already has a text layer and neither `--force-ocr` nor
    /// `--skip-text` was given
    PriorOcrFound,
    /// Any other non-zero exit, or death by signal (`None`)
    Failed { exit_code: Option<i32> },
}

impl ProcessStatus {
    pub fn from_exit_code(exit_code: Option<i32>) -> Self {
        match exit_code {
            Some(EXIT_OK) => Self::Success,
            Some(EXIT_ALREADY_DONE_OCR) => Self::PriorOcrFound,
            other => Self::Failed { exit_code: other },
        }
    }
}

/// Human readable meaning of an ocrmypdf exit code, for logs and error bodies
pub fn describe_exit_code(exit_code: Option<i32>) -> &'static str {
    match exit_code {
        Some(0) => "ok",
        Some(1) => "bad_args",
        Some(2) => "input_file",
        Some(3) => "missing_dependency",
        Some(4) => "invalid_output_pdf",
        Some(5) => "file_access_error",
        Some(6) => "already_done_ocr",
        Some(7) => "child_process_error",
        Some(8) => "encrypted_pdf",
        Some(9) => "invalid_config",
        Some(10) => "pdfa_conversion_failed",
        Some(15) => "other_error",
        Some(130) => "ctrl_c",
        Some(_) => "unknown",
        None => "killed_by_signal",
    }
}

/// Captured result of one ocrmypdf invocation
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    /// Standard error, truncated for reporting
    pub stderr: String,
    /// Standard output, truncated; only logged
    pub stdout: String,
    pub elapsed: Duration,
}

impl ProcessOutcome {
    pub fn status(&self) -> ProcessStatus {
        ProcessStatus::from_exit_code(self.exit_code)
    }
}

/// Versions of the external toolchain
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolVersions {
    pub ocrmypdf: Option<String>,
    pub tesseract: Option<String>,
}

/// OCR processor trait
#[async_trait]
pub trait OcrProcessor: Send + Sync {
    /// Add a text layer to `input`, writing the result to `output`
    async fn process(
        &self,
        input: &Path,
        output: &Path,
        options: &OcrOptions,
    ) -> Result<ProcessOutcome, OcrError>;

    /// Report external tool versions (`None` when a tool cannot be run)
    async fn versions(&self) -> ToolVersions;
}

/// Configuration for the ocrmypdf processor
#[derive(Debug, Clone)]
pub struct OcrMyPdfConfig {
    /// Path to ocrmypdf executable (default: "ocrmypdf" - uses PATH)
    pub ocrmypdf_path: String,
    /// Path to tesseract executable, for version reporting
    pub tesseract_path: String,
    /// Number of parallel jobs (`--jobs`)
    pub jobs: usize,
    /// Maximum characters of stderr/stdout kept
    pub diagnostics_limit: usize,
}

impl Default for OcrMyPdfConfig {
    fn default() -> Self {
        Self {
            ocrmypdf_path: "ocrmypdf".to_string(),
            tesseract_path: "tesseract".to_string(),
            jobs: 1,
            diagnostics_limit: 1000,
        }
    }
}

impl From<&crate::config::OcrConfig> for OcrMyPdfConfig {
    fn from(config: &crate::config::OcrConfig) -> Self {
        Self {
            ocrmypdf_path: config.ocrmypdf_path.clone(),
            tesseract_path: config.tesseract_path.clone(),
            jobs: config.jobs,
            diagnostics_limit: config.diagnostics_limit,
        }
    }
}

/// Processor backed by the ocrmypdf command-line tool
pub struct OcrMyPdf {
    config: OcrMyPdfConfig,
}

impl OcrMyPdf {
    pub fn new(config: OcrMyPdfConfig) -> Self {
        Self { config }
    }

    /// Build the ocrmypdf argument list.
    ///
    /// The mapping is deterministic: the same options always yield the same
    /// arguments. `--optimize` is passed even for level 0 because ocrmypdf
    /// otherwise defaults to level 1.
    pub fn build_args(&self, input: &Path, output: &Path, options: &OcrOptions) -> Vec<String> {
        let mut args = vec![
            "-l".to_string(),
            options.language.as_str().to_string(),
            "--jobs".to_string(),
            self.config.jobs.to_string(),
        ];

        if options.force_ocr {
            args.push("--force-ocr".to_string());
        } else if options.skip_text {
            args.push("--skip-text".to_string());
        }

        if options.deskew {
            args.push("--deskew".to_string());
        }

        args.push("--optimize".to_string());
        args.push(options.optimize.get().to_string());

        args.push(input.display().to_string());
        args.push(output.display().to_string());
        args
    }

    async fn tool_version(&self, program: &str) -> Option<String> {
        let mut cmd = Command::new(program);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(VERSION_TIMEOUT, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(output)) => {
                tracing::warn!(program, status = %output.status, "Version check failed");
                return None;
            }
            Ok(Err(e)) => {
                tracing::warn!(program, "Failed to run version check: {}", e);
                return None;
            }
            Err(_) => {
                tracing::warn!(program, "Version check timed out");
                return None;
            }
        };

        // Older tesseract builds print their version on stderr
        first_line(&output.stdout).or_else(|| first_line(&output.stderr))
    }
}

#[async_trait]
impl OcrProcessor for OcrMyPdf {
    async fn process(
        &self,
        input: &Path,
        output: &Path,
        options: &OcrOptions,
    ) -> Result<ProcessOutcome, OcrError> {
        let tool = &self.config.ocrmypdf_path;
        let args = self.build_args(input, output, options);

        tracing::info!("Executing command: {} {}", tool, args.join(" "));

        let mut cmd = Command::new(tool);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can take down tesseract/gs children too
        #[cfg(unix)]
        cmd.process_group(0);

        let start_time = Instant::now();
        let child = cmd.spawn().map_err(|source| OcrError::Spawn {
            tool: tool.clone(),
            source,
        })?;

        let mut group = ProcessGroupGuard::new(child.id());
        let output = child.wait_with_output().await.map_err(|source| OcrError::Wait {
            tool: tool.clone(),
            source,
        })?;
        group.disarm();

        let limit = self.config.diagnostics_limit;
        Ok(ProcessOutcome {
            exit_code: output.status.code(),
            stderr: truncate_chars(&String::from_utf8_lossy(&output.stderr), limit),
            stdout: truncate_chars(&String::from_utf8_lossy(&output.stdout), limit),
            elapsed: start_time.elapsed(),
        })
    }

    async fn versions(&self) -> ToolVersions {
        let (ocrmypdf, tesseract) = tokio::join!(
            self.tool_version(&self.config.ocrmypdf_path),
            self.tool_version(&self.config.tesseract_path),
        );
        ToolVersions { ocrmypdf, tesseract }
    }
}

/// Kills the child's process group if dropped before the child is reaped.
///
/// `kill_on_drop` only reaches the direct child; ocrmypdf fans out into
/// tesseract and ghostscript workers that would otherwise keep running.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };

        #[cfg(unix)]
        {
            tracing::warn!(pgid, "Killing ocrmypdf process group");
            // SAFETY: kill(2) with a negative pid only signals the group we created.
            let rc = unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
            if rc != 0 {
                tracing::debug!(pgid, "Process group already gone");
            }
        }

        #[cfg(not(unix))]
        let _ = pgid;
    }
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Truncate to at most `limit` characters on a char boundary
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}... [truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
