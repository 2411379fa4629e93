// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use securenexus::core::engine::{EngineError, ScanEngine};
use securenexus::core::models::{JobId, RawAlert};
use securenexus::core::orchestrator::ScanSettings;
use securenexus::core::probe::ProbePolicy;

/// Every engine call the fake saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Version,
    StartCrawl(String),
    CrawlProgress,
    StartAttack(String),
    AttackProgress,
    ListFindings(String),
}

/// One scripted answer to a progress poll.
#[derive(Debug, Clone, Copy)]
pub enum Poll {
    At(u8),
    /// The engine answers with an API error.
    Fails,
    /// The connection to the engine is lost.
    Drops,
}

struct Script {
    steps: VecDeque<Poll>,
    last: u8,
}

impl Script {
    fn new(steps: Vec<Poll>) -> Self {
        Self { steps: steps.into(), last: 0 }
    }

    /// Once the script runs out the last reported value repeats.
    fn next(&mut self) -> Result<u8, EngineError> {
        match self.steps.pop_front() {
            Some(Poll::At(progress)) => {
                self.last = progress;
                Ok(progress)
            }
            Some(Poll::Fails) => Err(EngineError::Api { status: 500, message: "internal error".into() }),
            Some(Poll::Drops) => Err(EngineError::Unreachable("connection refused".into())),
            None => Ok(self.last),
        }
    }
}

/// Scripted stand-in for the ZAP control API.
pub struct FakeEngine {
    reachable: AtomicBool,
    crawl: Mutex<Script>,
    attack: Mutex<Script>,
    alerts: Vec<RawAlert>,
    crawl_delay: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            crawl: Mutex::new(Script::new(vec![Poll::At(100)])),
            attack: Mutex::new(Script::new(vec![Poll::At(100)])),
            alerts: Vec::new(),
            crawl_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(self) -> Self {
        self.reachable.store(false, Ordering::SeqCst);
        self
    }

    pub fn crawl(self, steps: Vec<Poll>) -> Self {
        *self.crawl.lock().unwrap() = Script::new(steps);
        self
    }

    pub fn attack(self, steps: Vec<Poll>) -> Self {
        *self.attack.lock().unwrap() = Script::new(steps);
        self
    }

    pub fn alerts(mut self, alerts: Vec<RawAlert>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Time `start_crawl` takes to answer.
    pub fn crawl_delay(mut self, delay: Duration) -> Self {
        self.crawl_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Highest number of scans seen between crawl start and alert collection.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ScanEngine for FakeEngine {
    async fn version(&self) -> Result<String, EngineError> {
        self.record(Call::Version);
        if self.reachable.load(Ordering::SeqCst) {
            Ok("2.15.0".into())
        } else {
            Err(EngineError::Unreachable("connection refused".into()))
        }
    }

    async fn start_crawl(&self, url: &str) -> Result<JobId, EngineError> {
        self.record(Call::StartCrawl(url.to_string()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.crawl_delay.is_zero() {
            tokio::time::sleep(self.crawl_delay).await;
        }
        Ok("1".into())
    }

    async fn crawl_progress(&self, _job: &JobId) -> Result<u8, EngineError> {
        self.record(Call::CrawlProgress);
        self.crawl.lock().unwrap().next()
    }

    async fn start_attack(&self, url: &str) -> Result<JobId, EngineError> {
        self.record(Call::StartAttack(url.to_string()));
        Ok("2".into())
    }

    async fn attack_progress(&self, _job: &JobId) -> Result<u8, EngineError> {
        self.record(Call::AttackProgress);
        self.attack.lock().unwrap().next()
    }

    async fn list_findings(&self, base_url: &str) -> Result<Vec<RawAlert>, EngineError> {
        self.record(Call::ListFindings(base_url.to_string()));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.alerts.clone())
    }
}

pub fn alert(name: &str, risk: &str) -> RawAlert {
    RawAlert {
        alert: Some(name.into()),
        risk: Some(risk.into()),
        description: Some(format!("{name} was detected.")),
        url: Some("http://example.com/login".into()),
        param: None,
    }
}

/// Short timings so paused-clock tests stay readable.
pub fn test_settings() -> ScanSettings {
    ScanSettings {
        probe: ProbePolicy::new(2, Duration::from_secs(1)),
        crawl_poll_interval: Duration::from_secs(5),
        attack_poll_interval: Duration::from_secs(10),
        crawl_ceiling: Some(Duration::from_secs(60)),
        attack_ceiling: Duration::from_secs(120),
        poll_error_budget: 3,
    }
}

pub fn shared(engine: FakeEngine) -> Arc<FakeEngine> {
    Arc::new(engine)
}
