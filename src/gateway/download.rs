// src/gateway/download.rs

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

// Bare file names only: no separators, no leading dots beyond the name itself.
static REPORT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*\.pdf$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("invalid report name")]
    InvalidName,
    #[error("report file not found")]
    NotFound,
}

/// Resolves a caller-supplied report name to a file inside `root`.
///
/// The name must be a plain `*.pdf` file name, and the resolved path (after
/// following symlinks) must still live under `root`.
pub async fn resolve_report_path(root: &Path, name: &str) -> Result<PathBuf, DownloadError> {
    if name.contains("..") || !REPORT_NAME.is_match(name) {
        warn!(name, "Rejected report download name.");
        return Err(DownloadError::InvalidName);
    }

    let root = tokio::fs::canonicalize(root).await.map_err(|_| DownloadError::NotFound)?;
    let resolved = tokio::fs::canonicalize(root.join(name))
        .await
        .map_err(|_| DownloadError::NotFound)?;

    if !resolved.starts_with(&root) {
        warn!(name, resolved = %resolved.display(), "Report path escapes the report directory.");
        return Err(DownloadError::InvalidName);
    }

    match tokio::fs::metadata(&resolved).await {
        Ok(meta) if meta.is_file() => Ok(resolved),
        _ => Err(DownloadError::NotFound),
    }
}
