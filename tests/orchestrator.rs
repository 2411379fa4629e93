// tests/orchestrator.rs

mod common;

use std::time::Duration;

use common::{alert, shared, test_settings, Call, FakeEngine, Poll};
use securenexus::core::models::{ScanOutcome, Severity, NOT_AVAILABLE};
use securenexus::core::orchestrator::{ScanOrchestrator, ScanSettings};
use tokio::time::Instant;

const TARGET: &str = "http://example.com/";

#[tokio::test]
async fn invalid_targets_never_reach_the_engine() {
    let engine = shared(FakeEngine::new());
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    for raw in ["", "   ", "not a url", "ftp://example.com", "http://"] {
        assert_eq!(orchestrator.run_scan(raw).await, ScanOutcome::InvalidTarget, "{raw:?}");
    }
    assert!(engine.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn attack_starts_only_after_the_crawl_completes() {
    let engine = shared(
        FakeEngine::new()
            .crawl(vec![Poll::At(0), Poll::At(40), Poll::At(100)])
            .attack(vec![Poll::At(0), Poll::At(100)])
            .alerts(vec![alert("Cross Site Scripting", "High"), alert("Cookie Without Secure Flag", "Low")]),
    );
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    let outcome = orchestrator.run_scan("http://example.com").await;

    assert_eq!(
        engine.calls(),
        vec![
            Call::Version,
            Call::StartCrawl(TARGET.into()),
            Call::CrawlProgress,
            Call::CrawlProgress,
            Call::CrawlProgress,
            Call::StartAttack(TARGET.into()),
            Call::AttackProgress,
            Call::AttackProgress,
            Call::ListFindings(TARGET.into()),
        ]
    );

    let ScanOutcome::Success(findings) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].name, "Cross Site Scripting");
    assert_eq!(findings[0].severity, Severity::High);
    assert_eq!(findings[1].severity, Severity::Low);
    assert_eq!(findings[1].param, NOT_AVAILABLE);
}

#[tokio::test(start_paused = true)]
async fn polls_wait_the_configured_interval() {
    let engine = shared(
        FakeEngine::new()
            .crawl(vec![Poll::At(0), Poll::At(50), Poll::At(100)])
            .attack(vec![Poll::At(0), Poll::At(100)]),
    );
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    let started = Instant::now();
    let outcome = orchestrator.run_scan(TARGET).await;

    assert!(matches!(outcome, ScanOutcome::Success(_)));
    // Two crawl sleeps of 5s and one attack sleep of 10s.
    assert!(started.elapsed() >= Duration::from_secs(20));
    assert!(started.elapsed() < Duration::from_secs(21));
}

#[tokio::test(start_paused = true)]
async fn attack_ceiling_yields_partial_results() {
    let engine = shared(
        FakeEngine::new()
            .attack(vec![Poll::At(0), Poll::At(10)])
            .alerts(vec![alert("SQL Injection", "High")]),
    );
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    let started = Instant::now();
    let outcome = orchestrator.run_scan(TARGET).await;

    let ScanOutcome::TimedOut(findings) = outcome else {
        panic!("expected a timed-out outcome, got {outcome:?}");
    };
    assert_eq!(findings.len(), 1);
    assert!(started.elapsed() >= Duration::from_secs(120));
    assert!(started.elapsed() < Duration::from_secs(140));
    assert_eq!(engine.count(&Call::ListFindings(TARGET.into())), 1);
}

#[tokio::test(start_paused = true)]
async fn crawl_ceiling_skips_the_attack() {
    let engine = shared(
        FakeEngine::new()
            .crawl(vec![Poll::At(20), Poll::At(50)])
            .alerts(vec![alert("Server Leaks Version", "Informational")]),
    );
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    let outcome = orchestrator.run_scan(TARGET).await;

    assert!(outcome.is_timed_out());
    assert_eq!(outcome.findings().map(|f| f.len()), Some(1));
    assert_eq!(engine.count(&Call::StartAttack(TARGET.into())), 0);
    assert_eq!(engine.count(&Call::AttackProgress), 0);
}

#[tokio::test(start_paused = true)]
async fn crawl_without_ceiling_waits_for_completion() {
    let mut steps = vec![Poll::At(10); 30];
    steps.push(Poll::At(100));
    let engine = shared(FakeEngine::new().crawl(steps));
    let settings = ScanSettings { crawl_ceiling: None, ..test_settings() };
    let orchestrator = ScanOrchestrator::new(engine.clone(), settings);

    // 30 sleeps of 5s run well past the 60s test ceiling.
    let outcome = orchestrator.run_scan(TARGET).await;

    assert!(matches!(outcome, ScanOutcome::Success(_)));
    assert_eq!(engine.count(&Call::StartAttack(TARGET.into())), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_poll_failures_are_absorbed() {
    let engine = shared(FakeEngine::new().crawl(vec![
        Poll::At(0),
        Poll::Fails,
        Poll::Fails,
        Poll::At(60),
        Poll::Fails,
        Poll::At(100),
    ]));
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    assert!(matches!(orchestrator.run_scan(TARGET).await, ScanOutcome::Success(_)));
}

#[tokio::test(start_paused = true)]
async fn persistent_poll_failures_fail_the_scan() {
    let engine = shared(
        FakeEngine::new().crawl(vec![Poll::At(0), Poll::Fails, Poll::Fails, Poll::Fails, Poll::At(100)]),
    );
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    match orchestrator.run_scan(TARGET).await {
        ScanOutcome::EngineError(message) => assert!(message.contains("internal error"), "{message}"),
        other => panic!("expected an engine error, got {other:?}"),
    }
    assert_eq!(engine.count(&Call::StartAttack(TARGET.into())), 0);
}

#[tokio::test(start_paused = true)]
async fn losing_the_engine_mid_scan_reports_unreachable() {
    let engine = shared(FakeEngine::new().attack(vec![Poll::At(30), Poll::Drops, Poll::Drops, Poll::Drops]));
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    assert_eq!(orchestrator.run_scan(TARGET).await, ScanOutcome::EngineUnreachable);
    assert_eq!(engine.count(&Call::ListFindings(TARGET.into())), 0);
}

#[tokio::test(start_paused = true)]
async fn unreachable_engine_is_retried_then_abandoned() {
    let engine = shared(FakeEngine::new().unreachable());
    let orchestrator = ScanOrchestrator::new(engine.clone(), test_settings());

    let started = Instant::now();
    assert_eq!(orchestrator.run_scan(TARGET).await, ScanOutcome::EngineUnreachable);

    assert_eq!(engine.calls(), vec![Call::Version, Call::Version]);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn scans_finishing_empty_succeed_with_no_findings() {
    let engine = shared(FakeEngine::new());
    let orchestrator = ScanOrchestrator::new(engine, test_settings());

    assert_eq!(orchestrator.run_scan(TARGET).await, ScanOutcome::Success(Vec::new()));
}
