// src/core/probe.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::core::engine::ScanEngine;

/// Attempt budget for a reachability check. No backoff: every retry waits the
/// same fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ProbePolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// A single attempt with no waiting, for fast pre-checks.
    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(3))
    }
}

/// Checks whether the engine's control API answers an identity call.
#[derive(Clone)]
pub struct ConnectivityProbe {
    engine: Arc<dyn ScanEngine>,
}

impl ConnectivityProbe {
    pub fn new(engine: Arc<dyn ScanEngine>) -> Self {
        Self { engine }
    }

    /// Returns the engine version on the first successful attempt, or `None`
    /// once `policy.max_attempts` calls have all failed. Never errors.
    pub async fn engine_version(&self, policy: ProbePolicy) -> Option<String> {
        let attempts = policy.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.engine.version().await {
                Ok(version) => {
                    info!(%version, attempt, "Connected to scanning engine API.");
                    return Some(version);
                }
                Err(e) => {
                    warn!(attempt, max_attempts = attempts, error = %e, "Could not connect to scanning engine API.");
                    // No point sleeping after the last attempt.
                    if attempt < attempts && !policy.delay.is_zero() {
                        tokio::time::sleep(policy.delay).await;
                    }
                }
            }
        }
        error!(attempts, "Scanning engine API unreachable after all attempts.");
        None
    }

    pub async fn is_reachable(&self, policy: ProbePolicy) -> bool {
        self.engine_version(policy).await.is_some()
    }
}
