// src/app.rs

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::engine::ScanEngine;
use crate::core::orchestrator::{ScanOrchestrator, ScanSettings};
use crate::core::probe::ConnectivityProbe;
use crate::gateway::pool::ScanPool;
use crate::llm::TextModel;
use crate::report::{PdfReport, ReportStore};

/// Everything the request handlers share. Built once at start-up.
pub struct App {
    pub pool: ScanPool,
    pub probe: ConnectivityProbe,
    pub reports: ReportStore,
    pub model: Option<Arc<dyn TextModel>>,
    pub static_dir: Option<PathBuf>,
}

impl App {
    /// Wires the engine, the scan pool and the report store together.
    ///
    /// # Arguments
    /// * `engine` - The scanner every scan runs against.
    /// * `settings` - Poll intervals and time limits for each scan.
    /// * `workers` - How many scans may run at once.
    /// * `report_dir` - Where finished reports are stored for download.
    pub fn new(
        engine: Arc<dyn ScanEngine>,
        settings: ScanSettings,
        workers: usize,
        report_dir: PathBuf,
    ) -> Self {
        let orchestrator = ScanOrchestrator::new(engine, settings);
        let reports = ReportStore::new(Arc::new(PdfReport::new()), report_dir);
        Self {
            probe: orchestrator.probe().clone(),
            pool: ScanPool::new(orchestrator, workers).with_reports(reports.clone()),
            reports,
            model: None,
            static_dir: None,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn TextModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_static_dir(mut self, dir: PathBuf) -> Self {
        self.static_dir = Some(dir);
        self
    }
}
