// src/core/engine/mod.rs

// The control API of the external scanning engine. The orchestrator only ever
// talks to a `dyn ScanEngine`, so tests substitute a scripted fake.
pub mod zap_client;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::models::{JobId, RawAlert};

pub use self::zap_client::ZapClient;

/// Failures raised while talking to the engine's control API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The control API could not be reached at all (refused, timed out, proxy down).
    #[error("engine unreachable: {0}")]
    Unreachable(String),

    /// The engine answered with an error status or error payload.
    #[error("engine API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The engine answered, but not with something we understand.
    #[error("unexpected engine response: {0}")]
    Malformed(String),

    #[error("invalid engine address '{0}'")]
    InvalidAddress(String),
}

impl EngineError {
    /// Whether this failure means the engine itself is gone, as opposed to the
    /// engine rejecting a request.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, EngineError::Unreachable(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() || body_lost(&err) {
            EngineError::Unreachable(err.to_string())
        } else if err.is_decode() {
            EngineError::Malformed(err.to_string())
        } else {
            EngineError::Api {
                status: err.status().map(|s| s.as_u16()).unwrap_or_default(),
                message: err.to_string(),
            }
        }
    }
}

/// A decode error that is not a JSON error: the connection dropped while the
/// body was still being read.
fn body_lost(err: &reqwest::Error) -> bool {
    if !err.is_decode() {
        return false;
    }
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if cause.is::<serde_json::Error>() {
            return false;
        }
        source = cause.source();
    }
    true
}

/// The operations the orchestrator consumes from the remote engine.
///
/// Progress values are percentages in `0..=100`.
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Lightweight identity call used for reachability checks.
    async fn version(&self) -> Result<String, EngineError>;

    async fn start_crawl(&self, url: &str) -> Result<JobId, EngineError>;

    async fn crawl_progress(&self, job: &JobId) -> Result<u8, EngineError>;

    async fn start_attack(&self, url: &str) -> Result<JobId, EngineError>;

    async fn attack_progress(&self, job: &JobId) -> Result<u8, EngineError>;

    /// Every alert the engine has recorded under `base_url`.
    async fn list_findings(&self, base_url: &str) -> Result<Vec<RawAlert>, EngineError>;
}

/// Parses the engine's textual progress value, clamping to 100.
pub fn parse_progress(raw: &str) -> Result<u8, EngineError> {
    raw.trim()
        .parse::<u32>()
        .map(|value| value.min(100) as u8)
        .map_err(|_| EngineError::Malformed(format!("progress value '{raw}' is not a number")))
}
