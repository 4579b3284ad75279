//! Page counting for the pre-processing limit check

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PageCountError {
    #[error("Failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("Page count task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Count the pages of a PDF on disk.
///
/// Parsing is blocking work and runs on the blocking pool.
pub async fn count_pages(path: &Path) -> Result<usize, PageCountError> {
    let path: PathBuf = path.to_path_buf();
    let count = tokio::task::spawn_blocking(move || {
        lopdf::Document::load(&path).map(|doc| doc.get_pages().len())
    })
    .await??;
    Ok(count)
}
