// src/gateway/pool.rs

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::core::models::ScanOutcome;
use crate::core::orchestrator::ScanOrchestrator;
use crate::report::{ReportError, ReportStore, StoredReport};

// --- Risultato ---
// Result

/// What a pool task hands back: the scan outcome and, when the scan produced
/// findings and the pool has a report store, the stored report.
#[derive(Debug)]
pub struct CompletedScan {
    pub outcome: ScanOutcome,
    pub report: Option<Result<StoredReport, ReportError>>,
}

// --- Pool ---

/// Runs scans in background tasks, at most `size` at a time.
///
/// Extra submissions wait for a permit instead of starting. A scan keeps
/// running even if the request that submitted it goes away, and its report is
/// stored from inside the task, so it can still be downloaded later.
#[derive(Clone)]
pub struct ScanPool {
    orchestrator: ScanOrchestrator,
    reports: Option<ReportStore>,
    permits: Arc<Semaphore>,
    size: usize,
}

impl ScanPool {
    /// Creates a pool that only scans; see [`ScanPool::with_reports`].
    ///
    /// # Arguments
    /// * `orchestrator` - Drives each scan; cloned into every task.
    /// * `size` - Maximum concurrent scans. Zero is raised to one.
    pub fn new(orchestrator: ScanOrchestrator, size: usize) -> Self {
        let size = size.max(1);
        Self { orchestrator, reports: None, permits: Arc::new(Semaphore::new(size)), size }
    }

    /// Renders and stores a report at the end of every scan with findings.
    pub fn with_reports(mut self, reports: ReportStore) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Spawns the scan of `target`. Dropping the returned handle does not
    /// cancel the scan or its report.
    pub fn submit(&self, target: String) -> JoinHandle<CompletedScan> {
        let permits = self.permits.clone();
        let orchestrator = self.orchestrator.clone();
        let reports = self.reports.clone();
        if permits.available_permits() == 0 {
            info!(target_url = %target, "All scan slots busy, queueing scan.");
        }
        tokio::spawn(async move {
            let permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let outcome = ScanOutcome::EngineError("scan pool is shut down".to_string());
                    return CompletedScan { outcome, report: None };
                }
            };
            debug!(target_url = %target, "Scan slot acquired.");
            let outcome = orchestrator.run_scan(&target).await;
            // Rendering does not need the engine, so the slot goes to the next scan.
            drop(permit);

            let report = match &reports {
                Some(store) => store.store(&target, &outcome).await.transpose(),
                None => None,
            };
            if let Some(Err(e)) = &report {
                error!(target_url = %target, error = %e, "Report generation failed.");
            }
            CompletedScan { outcome, report }
        })
    }

    /// Submits and waits for the result.
    pub async fn run(&self, target: String) -> CompletedScan {
        match self.submit(target).await {
            Ok(completed) => completed,
            Err(e) => {
                error!(error = %e, "Scan task panicked or was cancelled.");
                CompletedScan {
                    outcome: ScanOutcome::EngineError("scan worker failed".to_string()),
                    report: None,
                }
            }
        }
    }
}
