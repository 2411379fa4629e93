// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

// --- Valori Sentinella ---
// Sentinel Values

/// Placeholder stored in a finding field the engine did not report.
pub const NOT_AVAILABLE: &str = "N/A";

/// Handle returned by the engine when a crawl or attack job is started.
pub type JobId = String;

// --- Target ---

/// Reasons a raw target string is refused before any network call.
#[derive(Debug, Error, PartialEq)]
pub enum TargetError {
    #[error("target URL is empty")]
    Empty,
    #[error("target URL is malformed: {0}")]
    Malformed(#[from] url::ParseError),
    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("target URL has no host")]
    MissingHost,
}

/// A validated absolute http(s) URL.
///
/// Only constructible through [`ScanTarget::parse`], so holding one proves the
/// string was checked before it reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    url: Url,
}

impl ScanTarget {
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TargetError::Empty);
        }

        let url = Url::parse(trimmed)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TargetError::UnsupportedScheme(url.scheme().to_string()));
        }
        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(TargetError::MissingHost),
        }

        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// --- Severita ---
// Severity

/// Risk level attached to a finding, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
    Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    #[strum(to_string = "Informational", serialize = "Info")]
    Informational,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Maps the engine's free-form risk label onto a severity.
    ///
    /// Missing or unrecognised labels fall back to `Informational` so a single
    /// odd record never aborts collection.
    pub fn from_risk_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some(text) if !text.is_empty() => text.parse().unwrap_or_else(|_| {
                warn!(risk = text, "Unrecognised risk label, treating as Informational.");
                Severity::Informational
            }),
            _ => Severity::Informational,
        }
    }
}

// --- Finding ---

/// One alert record exactly as the engine returns it.
///
/// Every field is optional; the engine omits keys freely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawAlert {
    #[serde(default)]
    pub alert: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}

/// A normalised issue reported by the engine for the scanned target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub name: String,
    pub severity: Severity,
    pub description: String,
    pub url: String,
    pub param: String,
}

fn or_sentinel(value: Option<String>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => NOT_AVAILABLE.to_string(),
    }
}

impl From<RawAlert> for Finding {
    fn from(raw: RawAlert) -> Self {
        let severity = Severity::from_risk_label(raw.risk.as_deref());
        Self {
            name: or_sentinel(raw.alert),
            severity,
            description: or_sentinel(raw.description),
            url: or_sentinel(raw.url),
            param: or_sentinel(raw.param),
        }
    }
}

/// Converts a batch of raw engine records, preserving order and duplicates.
pub fn normalize_alerts(raw: Vec<RawAlert>) -> Vec<Finding> {
    debug!(records = raw.len(), "Normalising engine alert records.");
    raw.into_iter().map(Finding::from).collect()
}

// --- Sessione di Scansione ---
// Scan Session

/// Lifecycle of a single scan session. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum ScanPhase {
    Idle,
    Crawling,
    Attacking,
    Collecting,
    Done,
    Failed,
}

impl ScanPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanPhase::Done | ScanPhase::Failed)
    }

    /// `Failed` is reachable from any live phase; otherwise phases advance in
    /// declaration order, with `Crawling -> Collecting` allowed for a crawl
    /// that ran out of time.
    pub fn can_advance_to(self, next: ScanPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            ScanPhase::Failed => true,
            _ => next > self,
        }
    }
}

/// State owned by one orchestrator invocation for one target.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub target: ScanTarget,
    pub crawl_job: Option<JobId>,
    pub attack_job: Option<JobId>,
    pub started_at: DateTime<Utc>,
    phase: ScanPhase,
}

impl ScanSession {
    pub fn new(target: ScanTarget) -> Self {
        Self {
            target,
            crawl_job: None,
            attack_job: None,
            started_at: Utc::now(),
            phase: ScanPhase::Idle,
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Moves the session forward, refusing any backwards transition.
    pub fn advance(&mut self, next: ScanPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            warn!(from = %self.phase, to = %next, "Refusing illegal scan phase transition.");
            return false;
        }
        debug!(target_url = %self.target, from = %self.phase, to = %next, "Scan phase transition.");
        self.phase = next;
        true
    }
}

// --- Esito ---
// Outcome

/// The only value an orchestrator run hands back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Success(Vec<Finding>),
    EngineUnreachable,
    InvalidTarget,
    EngineError(String),
    TimedOut(Vec<Finding>),
}

impl ScanOutcome {
    /// Findings that can be handed to the report stage, if any.
    pub fn findings(&self) -> Option<&[Finding]> {
        match self {
            ScanOutcome::Success(findings) | ScanOutcome::TimedOut(findings) => Some(findings),
            _ => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, ScanOutcome::TimedOut(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScanOutcome::Success(_) => "success",
            ScanOutcome::EngineUnreachable => "engine_unreachable",
            ScanOutcome::InvalidTarget => "invalid_target",
            ScanOutcome::EngineError(_) => "engine_error",
            ScanOutcome::TimedOut(_) => "timed_out",
        }
    }
}

// --- Riepilogo ---
// Summary

/// Raw per-severity counts of a finding list. Duplicates are counted as-is.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub informational: usize,
}

impl ScanSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        findings.iter().fold(Self::default(), |mut summary, finding| {
            match finding.severity {
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Informational => summary.informational += 1,
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low + self.informational
    }
}
