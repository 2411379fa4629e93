// tests/pool.rs

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{alert, shared, test_settings, FakeEngine};
use securenexus::core::models::ScanOutcome;
use securenexus::core::orchestrator::ScanOrchestrator;
use securenexus::gateway::pool::ScanPool;
use securenexus::report::store::report_file_name;
use securenexus::report::{PdfReport, ReportStore};

fn reporting_pool(engine: FakeEngine, dir: &Path) -> ScanPool {
    let store = ReportStore::new(Arc::new(PdfReport::new()), dir.to_path_buf());
    ScanPool::new(ScanOrchestrator::new(shared(engine), test_settings()), 1).with_reports(store)
}

async fn wait_for(path: &Path) -> bool {
    for _ in 0..100 {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test(start_paused = true)]
async fn never_runs_more_scans_than_slots() {
    let engine = shared(FakeEngine::new().crawl_delay(Duration::from_secs(30)));
    let pool = ScanPool::new(ScanOrchestrator::new(engine.clone(), test_settings()), 3);

    let handles: Vec<_> = (0..6)
        .map(|i| pool.submit(format!("http://site{i}.example.com")))
        .collect();
    for handle in handles {
        assert!(matches!(handle.await.unwrap().outcome, ScanOutcome::Success(_)));
    }

    assert_eq!(engine.max_in_flight(), 3);
    assert_eq!(pool.available(), 3);
}

#[tokio::test]
async fn zero_workers_still_gets_one_slot() {
    let engine = shared(FakeEngine::new());
    let pool = ScanPool::new(ScanOrchestrator::new(engine, test_settings()), 0);

    assert_eq!(pool.size(), 1);
    let completed = pool.run("http://example.com".into()).await;
    assert_eq!(completed.outcome, ScanOutcome::Success(Vec::new()));
    assert!(completed.report.is_none());
}

#[tokio::test]
async fn rejected_targets_come_back_through_the_pool() {
    let engine = shared(FakeEngine::new());
    let pool = ScanPool::new(ScanOrchestrator::new(engine.clone(), test_settings()), 2);

    assert_eq!(pool.run("not a url".into()).await.outcome, ScanOutcome::InvalidTarget);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn reports_are_stored_by_the_scan_task() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new().alerts(vec![alert("Cookie No HttpOnly Flag", "Low")]);
    let pool = reporting_pool(engine, dir.path());

    let completed = pool.run("http://example.com/".into()).await;

    let stored = completed.report.unwrap().unwrap();
    assert_eq!(stored.file_name, report_file_name("http://example.com/", "pdf"));
    assert_eq!(std::fs::read(dir.path().join(&stored.file_name)).unwrap(), stored.bytes);
}

#[tokio::test]
async fn dropped_handles_still_leave_a_report() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FakeEngine::new()
        .crawl_delay(Duration::from_millis(300))
        .alerts(vec![alert("Cookie No HttpOnly Flag", "Low")]);
    let pool = reporting_pool(engine, dir.path());

    drop(pool.submit("http://example.com/".into()));

    let expected = dir.path().join(report_file_name("http://example.com/", "pdf"));
    assert!(!expected.exists());
    assert!(wait_for(&expected).await, "report never appeared");
}

#[tokio::test(start_paused = true)]
async fn failed_scans_store_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let pool = reporting_pool(FakeEngine::new().unreachable(), dir.path());

    let completed = pool.run("http://example.com/".into()).await;

    assert_eq!(completed.outcome, ScanOutcome::EngineUnreachable);
    assert!(completed.report.is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
