// src/core/orchestrator.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::core::engine::{EngineError, ScanEngine};
use crate::core::models::{
    normalize_alerts, JobId, ScanOutcome, ScanPhase, ScanSession, ScanSummary, ScanTarget,
};
use crate::core::probe::{ConnectivityProbe, ProbePolicy};

// --- Impostazioni ---
// Settings

/// Timing knobs for one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Reachability check performed before the crawl starts.
    pub probe: ProbePolicy,
    pub crawl_poll_interval: Duration,
    pub attack_poll_interval: Duration,
    /// `None` waits on the crawl indefinitely.
    pub crawl_ceiling: Option<Duration>,
    /// Measured from the moment the attack phase is submitted.
    pub attack_ceiling: Duration,
    /// Consecutive failed progress polls tolerated before the phase aborts.
    pub poll_error_budget: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            probe: ProbePolicy::default(),
            crawl_poll_interval: Duration::from_secs(5),
            attack_poll_interval: Duration::from_secs(10),
            crawl_ceiling: Some(Duration::from_secs(30 * 60)),
            attack_ceiling: Duration::from_secs(30 * 60),
            poll_error_budget: 3,
        }
    }
}

// --- Fasi ---
// Phases

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Crawl,
    Attack,
}

impl Job {
    fn label(self) -> &'static str {
        match self {
            Job::Crawl => "spider",
            Job::Attack => "active scan",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitEnd {
    Completed,
    CeilingReached,
}

// --- Orchestratore ---
// Orchestrator

/// Drives the external engine through crawl, attack and collection for one
/// target at a time. Cheap to share: every run owns its own [`ScanSession`].
#[derive(Clone)]
pub struct ScanOrchestrator {
    engine: Arc<dyn ScanEngine>,
    probe: ConnectivityProbe,
    settings: ScanSettings,
}

impl ScanOrchestrator {
    /// Creates an orchestrator over `engine`.
    ///
    /// # Arguments
    /// * `engine` - The scanner to drive. Shared with the connectivity check.
    /// * `settings` - Poll intervals, ceilings and the reachability policy.
    pub fn new(engine: Arc<dyn ScanEngine>, settings: ScanSettings) -> Self {
        let probe = ConnectivityProbe::new(engine.clone());
        Self { engine, probe, settings }
    }

    pub fn probe(&self) -> &ConnectivityProbe {
        &self.probe
    }

    /// Runs a full scan of `raw_target`: reachability check, crawl, attack and
    /// alert collection.
    ///
    /// # Arguments
    /// * `raw_target` - The URL as the user typed it. It is validated and
    ///   normalised before anything is sent to the engine.
    ///
    /// # Returns
    /// A [`ScanOutcome`]. Every failure is folded into it: `InvalidTarget` for a
    /// bad URL, `EngineUnreachable` when the engine cannot be reached, and
    /// `EngineError` for any other engine fault. `TimedOut` carries whatever
    /// findings existed when a ceiling was hit.
    pub async fn run_scan(&self, raw_target: &str) -> ScanOutcome {
        let target = match ScanTarget::parse(raw_target) {
            Ok(target) => target,
            Err(e) => {
                warn!(input = raw_target, error = %e, "Rejected scan target.");
                return ScanOutcome::InvalidTarget;
            }
        };

        if !self.probe.is_reachable(self.settings.probe).await {
            return ScanOutcome::EngineUnreachable;
        }

        let mut session = ScanSession::new(target);
        info!(target_url = %session.target, started_at = %session.started_at, "Scan session started.");

        match self.drive(&mut session).await {
            Ok(outcome) => {
                session.advance(ScanPhase::Done);
                let elapsed = chrono::Utc::now() - session.started_at;
                info!(
                    target_url = %session.target,
                    outcome = outcome.label(),
                    elapsed_secs = elapsed.num_seconds(),
                    "Scan session finished."
                );
                outcome
            }
            Err(e) => {
                let failed_in = session.phase();
                session.advance(ScanPhase::Failed);
                error!(target_url = %session.target, phase = %failed_in, error = %e, "Scan session failed.");
                if e.is_connectivity() {
                    ScanOutcome::EngineUnreachable
                } else {
                    ScanOutcome::EngineError(e.to_string())
                }
            }
        }
    }

    /// Crawl, attack and collect for an already validated session.
    ///
    /// # Returns
    /// The outcome with findings, or the first engine error that escaped the
    /// poll error budget.
    async fn drive(&self, session: &mut ScanSession) -> Result<ScanOutcome, EngineError> {
        let url = session.target.as_str().to_string();

        session.advance(ScanPhase::Crawling);
        info!(target_url = %url, "Starting spider.");
        let crawl_job = self.engine.start_crawl(&url).await?;
        session.crawl_job = Some(crawl_job.clone());

        let crawl_end = self
            .wait_for(Job::Crawl, &crawl_job, self.settings.crawl_poll_interval, self.settings.crawl_ceiling)
            .await?;

        let timed_out = match crawl_end {
            // The crawl never reached 100, so the attack phase must not start.
            WaitEnd::CeilingReached => {
                warn!(target_url = %url, "Spider exceeded its time ceiling, skipping active scan.");
                true
            }
            WaitEnd::Completed => {
                session.advance(ScanPhase::Attacking);
                info!(target_url = %url, "Spider complete. Starting active scan.");
                let attack_job = self.engine.start_attack(&url).await?;
                session.attack_job = Some(attack_job.clone());

                let attack_end = self
                    .wait_for(
                        Job::Attack,
                        &attack_job,
                        self.settings.attack_poll_interval,
                        Some(self.settings.attack_ceiling),
                    )
                    .await?;
                if attack_end == WaitEnd::CeilingReached {
                    warn!(
                        target_url = %url,
                        ceiling_secs = self.settings.attack_ceiling.as_secs(),
                        "Reached maximum active scan duration. Stopping wait."
                    );
                }
                attack_end == WaitEnd::CeilingReached
            }
        };

        session.advance(ScanPhase::Collecting);
        info!(target_url = %url, "Gathering alerts.");
        let findings = normalize_alerts(self.engine.list_findings(&url).await?);
        let summary = ScanSummary::from_findings(&findings);
        info!(
            target_url = %url,
            total = summary.total(),
            high = summary.high,
            medium = summary.medium,
            low = summary.low,
            informational = summary.informational,
            "Alerts collected."
        );

        Ok(if timed_out {
            ScanOutcome::TimedOut(findings)
        } else {
            ScanOutcome::Success(findings)
        })
    }

    async fn progress(&self, job: Job, id: &JobId) -> Result<u8, EngineError> {
        match job {
            Job::Crawl => self.engine.crawl_progress(id).await,
            Job::Attack => self.engine.attack_progress(id).await,
        }
    }

    // --- Attesa dei job ---
    // Job polling

    /// Polls `id` every `interval` until it reports 100 or `ceiling` elapses.
    ///
    /// A failed poll is retried on the next tick; the error only escapes once
    /// `poll_error_budget` polls in a row have failed.
    ///
    /// # Arguments
    /// * `job` - Which engine progress endpoint to poll.
    /// * `id` - The job id the engine returned when the job started.
    /// * `interval` - Pause between polls.
    /// * `ceiling` - Wall-clock limit for the wait, or `None` for no limit.
    ///
    /// # Returns
    /// `WaitEnd::Completed` at 100 percent, `WaitEnd::CeilingReached` when the
    /// ceiling elapses first, or the last poll error once the budget is spent.
    async fn wait_for(
        &self,
        job: Job,
        id: &JobId,
        interval: Duration,
        ceiling: Option<Duration>,
    ) -> Result<WaitEnd, EngineError> {
        let started = Instant::now();
        let budget = self.settings.poll_error_budget.max(1);
        let mut consecutive_failures = 0u32;

        loop {
            match self.progress(job, id).await {
                Ok(progress) if progress >= 100 => {
                    debug!(job = job.label(), %id, "Job reported completion.");
                    return Ok(WaitEnd::Completed);
                }
                Ok(progress) => {
                    consecutive_failures = 0;
                    info!(job = job.label(), %id, progress, "Job progress.");
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= budget {
                        error!(job = job.label(), %id, failures = consecutive_failures, error = %e, "Progress polling failed too many times.");
                        return Err(e);
                    }
                    warn!(job = job.label(), %id, failures = consecutive_failures, error = %e, "Progress poll failed, retrying.");
                }
            }

            if let Some(ceiling) = ceiling {
                if started.elapsed() >= ceiling {
                    return Ok(WaitEnd::CeilingReached);
                }
            }

            tokio::time::sleep(interval).await;
        }
    }
}
