//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::ocr::{OcrJobRunner, OcrMyPdf, OcrMyPdfConfig, OcrProcessor};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    jobs: OcrJobRunner,
}

impl AppState {
    /// Create application state backed by the ocrmypdf command-line tool
    pub fn new(config: Config) -> Self {
        let processor = Arc::new(OcrMyPdf::new(OcrMyPdfConfig::from(&config.ocr)));
        Self::with_processor(config, processor)
    }

    /// Create application state with a custom processor
    pub fn with_processor(config: Config, processor: Arc<dyn OcrProcessor>) -> Self {
        let jobs = OcrJobRunner::new(Arc::new(config.ocr.clone()), processor);
        Self {
            inner: Arc::new(AppStateInner { config, jobs }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the job runner
    pub fn jobs(&self) -> &OcrJobRunner {
        &self.inner.jobs
    }

    /// Get the OCR processor
    pub fn processor(&self) -> &Arc<dyn OcrProcessor> {
        self.inner.jobs.processor()
    }
}
