// src/report/store.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ReportError, ReportInput, ReportRenderer};
use crate::core::models::ScanOutcome;

// Distinguishes temporary files of concurrent writes within one process.
static WRITE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Prefix of every stored report file.
pub const REPORT_FILE_PREFIX: &str = "SecureNexus_Scan_Report_";

/// Name under which the report for `target` is stored.
pub fn report_file_name(target: &str, extension: &str) -> String {
    use std::hash::{DefaultHasher, Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    target.hash(&mut hasher);
    format!("{REPORT_FILE_PREFIX}{:016x}.{extension}", hasher.finish())
}

/// A report that has been rendered and written to the report directory.
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Renders reports and keeps them in one directory for later download.
#[derive(Clone)]
pub struct ReportStore {
    renderer: Arc<dyn ReportRenderer>,
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(renderer: Arc<dyn ReportRenderer>, dir: PathBuf) -> Self {
        Self { renderer, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn content_type(&self) -> &'static str {
        self.renderer.content_type()
    }

    /// Renders the report for a finished scan and stores it.
    ///
    /// # Arguments
    /// * `target` - The normalised target URL; it names the stored file.
    /// * `outcome` - The scan result. Only `Success` and `TimedOut` carry
    ///   findings to report on.
    ///
    /// # Returns
    /// The stored file name and the bytes written, `Ok(None)` for outcomes
    /// without findings, or a `ReportError` if rendering or writing failed.
    pub async fn store(
        &self,
        target: &str,
        outcome: &ScanOutcome,
    ) -> Result<Option<StoredReport>, ReportError> {
        let Some(findings) = outcome.findings() else {
            return Ok(None);
        };

        let renderer = self.renderer.clone();
        let owned_target = target.to_string();
        let owned_outcome = outcome.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            match ReportInput::from_outcome(&owned_target, &owned_outcome) {
                Some(input) => renderer.render(&input),
                None => Err(ReportError::Pdf("outcome carries no findings".to_string())),
            }
        })
        .await
        .map_err(|e| ReportError::Pdf(format!("render task failed: {e}")))??;

        let file_name = report_file_name(target, self.renderer.extension());
        self.write_atomically(&file_name, &bytes).await?;
        info!(
            target_url = target,
            report = %file_name,
            findings = findings.len(),
            "Report stored."
        );
        Ok(Some(StoredReport { file_name, bytes }))
    }

    /// Writes under a temporary name, then renames over `file_name`, so readers
    /// only ever see a complete file.
    async fn write_atomically(&self, file_name: &str, bytes: &[u8]) -> Result<(), ReportError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let sequence = WRITE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let temp = self
            .dir
            .join(format!(".{file_name}.{}.{sequence}.tmp", std::process::id()));
        let target = self.dir.join(file_name);

        tokio::fs::write(&temp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            warn!(temp = %temp.display(), error = %e, "Could not move report into place.");
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                debug!(error = %cleanup, "Temporary report already gone.");
            }
            return Err(e.into());
        }
        Ok(())
    }
}
