//! Configuration management for the OCRmyPDF server
//!
//! All settings come from the environment (optionally seeded from a `.env`
//! file) and are read exactly once at startup. The resulting [`Config`] is
//! immutable and shared between requests behind an `Arc`.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const MEGABYTE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Path to the ocrmypdf executable (default: "ocrmypdf" - uses PATH)
    pub ocrmypdf_path: String,
    /// Path to the tesseract executable, only used for version reporting
    pub tesseract_path: String,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
    /// Maximum page count accepted by the pre-check
    pub max_pages: usize,
    /// Wall-clock budget for a single ocrmypdf run
    pub timeout_secs: u64,
    /// Value passed to `--jobs`
    pub jobs: usize,
    /// Parent directory for job workspaces (default: system temp)
    pub work_dir: Option<PathBuf>,
    /// Maximum number of stderr characters reported back to clients
    pub diagnostics_limit: usize,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            ocr: OcrConfig::default(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            ocrmypdf_path: "ocrmypdf".to_string(),
            tesseract_path: "tesseract".to_string(),
            max_upload_bytes: 200 * MEGABYTE,
            max_pages: 1000,
            timeout_secs: 1800,
            jobs: 1,
            work_dir: None,
            diagnostics_limit: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// Unset variables take their defaults; set but unparseable ones are an
    /// error rather than being silently ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let max_upload_mb: u64 = parse_var(&var, "MAX_UPLOAD_SIZE_MB")?
            .unwrap_or(defaults.ocr.max_upload_bytes / MEGABYTE);
        let timeout_secs: u64 =
            parse_var(&var, "OCR_TIMEOUT_SECONDS")?.unwrap_or(defaults.ocr.timeout_secs);
        let jobs: usize = parse_var(&var, "OCR_JOBS")?.unwrap_or(defaults.ocr.jobs);

        if max_upload_mb == 0 {
            return Err(positive_required("MAX_UPLOAD_SIZE_MB", max_upload_mb));
        }
        if timeout_secs == 0 {
            return Err(positive_required("OCR_TIMEOUT_SECONDS", timeout_secs));
        }
        if jobs == 0 {
            return Err(positive_required("OCR_JOBS", jobs));
        }
        let max_upload_bytes =
            max_upload_mb
                .checked_mul(MEGABYTE)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: "MAX_UPLOAD_SIZE_MB",
                    value: max_upload_mb.to_string(),
                    reason: "too large to express in bytes".to_string(),
                })?;

        Ok(Config {
            server: ServerConfig {
                host: var("HOST").unwrap_or(defaults.server.host),
                port: parse_var(&var, "PORT")?.unwrap_or(defaults.server.port),
            },
            ocr: OcrConfig {
                ocrmypdf_path: var("OCRMYPDF_PATH").unwrap_or(defaults.ocr.ocrmypdf_path),
                tesseract_path: var("TESSERACT_PATH").unwrap_or(defaults.ocr.tesseract_path),
                max_upload_bytes,
                max_pages: parse_var(&var, "MAX_PAGES")?.unwrap_or(defaults.ocr.max_pages),
                timeout_secs,
                jobs,
                work_dir: var("OCR_WORK_DIR").map(PathBuf::from),
                diagnostics_limit: parse_var(&var, "OCR_DIAGNOSTICS_LIMIT")?
                    .unwrap_or(defaults.ocr.diagnostics_limit),
            },
        })
    }
}

fn parse_var<T, F>(var: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                value: raw,
                reason: e.to_string(),
            }),
    }
}

fn positive_required(name: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: "must be greater than zero".to_string(),
    }
}
