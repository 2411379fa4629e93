// src/config.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

use crate::core::orchestrator::ScanSettings;
use crate::core::probe::ProbePolicy;
use crate::llm::gemini::DEFAULT_MODEL;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("scan worker count must be at least 1")]
    NoWorkers,
    #[error("probe attempts must be at least 1")]
    NoProbeAttempts,
    #[error("poll intervals must be greater than zero")]
    ZeroPollInterval,
    #[error("invalid ZAP address '{0}'")]
    InvalidZapAddress(String),
}

/// SecureNexus web front end for ZAP scans and model-backed security checks.
///
/// Every option can also be supplied through the environment variable shown.
#[derive(Parser, Debug, Clone)]
#[command(name = "securenexus")]
#[command(version)]
#[command(about = "Web front end for ZAP scans and model-backed security checks", long_about = None)]
pub struct Args {
    /// Address the HTTP server listens on
    #[arg(long, env = "SECURENEXUS_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// ZAP API key
    #[arg(long, env = "ZAP_API_KEY", default_value = "", hide_env_values = true)]
    pub zap_api_key: String,

    /// ZAP proxy address, which also serves the ZAP API
    #[arg(long, env = "ZAP_PROXY", default_value = "http://127.0.0.1:8080")]
    pub zap_proxy: String,

    /// Gemini API key; the code-analysis and phishing routes are disabled without it
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub gemini_model: String,

    /// Maximum number of scans running at once
    #[arg(long, env = "SCAN_WORKERS", default_value_t = 3)]
    pub scan_workers: usize,

    /// Directory generated reports are written to (defaults to the OS temp dir)
    #[arg(long, env = "REPORT_DIR")]
    pub report_dir: Option<PathBuf>,

    /// Directory of static pages served at `/`
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Reachability attempts before a scan starts
    #[arg(long, default_value_t = 5)]
    pub probe_attempts: u32,

    /// Seconds between reachability attempts
    #[arg(long, default_value_t = 3)]
    pub probe_delay_secs: u64,

    /// Seconds between spider progress polls
    #[arg(long, default_value_t = 5)]
    pub crawl_poll_secs: u64,

    /// Seconds between active scan progress polls
    #[arg(long, default_value_t = 10)]
    pub attack_poll_secs: u64,

    /// Longest wait for the spider, in seconds; 0 waits forever
    #[arg(long, default_value_t = 30 * 60)]
    pub crawl_ceiling_secs: u64,

    /// Longest wait for the active scan, in seconds
    #[arg(long, default_value_t = 30 * 60)]
    pub attack_ceiling_secs: u64,

    /// Consecutive failed progress polls tolerated before a scan fails
    #[arg(long, default_value_t = 3)]
    pub poll_error_budget: u32,
}

impl Args {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.probe_attempts == 0 {
            return Err(ConfigError::NoProbeAttempts);
        }
        if self.crawl_poll_secs == 0 || self.attack_poll_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        match Url::parse(&self.zap_proxy) {
            Ok(url) if url.host_str().is_some() => Ok(()),
            _ => Err(ConfigError::InvalidZapAddress(self.zap_proxy.clone())),
        }
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            probe: ProbePolicy::new(self.probe_attempts, Duration::from_secs(self.probe_delay_secs)),
            crawl_poll_interval: Duration::from_secs(self.crawl_poll_secs),
            attack_poll_interval: Duration::from_secs(self.attack_poll_secs),
            crawl_ceiling: (self.crawl_ceiling_secs > 0)
                .then(|| Duration::from_secs(self.crawl_ceiling_secs)),
            attack_ceiling: Duration::from_secs(self.attack_ceiling_secs),
            poll_error_budget: self.poll_error_budget,
        }
    }

    pub fn report_dir(&self) -> PathBuf {
        self.report_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
