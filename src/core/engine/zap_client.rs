// src/core/engine/zap_client.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{parse_progress, EngineError, ScanEngine};
use crate::core::models::{JobId, RawAlert};

const API_KEY_HEADER: &str = "X-ZAP-API-Key";
const USER_AGENT: &str = concat!("SecureNexus/", env!("CARGO_PKG_VERSION"));

// --- Payload dell'API ---
// API payloads

/// Error body ZAP sends alongside a non-2xx status.
#[derive(Debug, Deserialize)]
struct ApiFault {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct AlertsEnvelope {
    #[serde(default)]
    alerts: Vec<RawAlert>,
}

// --- Client ---

/// Client for the OWASP ZAP JSON control API.
///
/// ZAP serves its API on the same address it proxies on, so the configured
/// proxy address doubles as the API base URL. The API key travels in the
/// `X-ZAP-API-Key` header on every call.
#[derive(Debug, Clone)]
pub struct ZapClient {
    base: Url,
    api_key: String,
    http: Client,
}

impl ZapClient {
    /// Builds a client for the ZAP instance at `address`.
    ///
    /// # Arguments
    /// * `address` - Base URL of the ZAP API, e.g. `http://127.0.0.1:8080`.
    ///   A trailing slash is added when missing.
    /// * `api_key` - Sent in the `X-ZAP-API-Key` header on every call.
    ///
    /// # Returns
    /// The client, or `EngineError::InvalidAddress` when `address` is not an
    /// absolute URL with a host.
    pub fn new(address: &str, api_key: &str) -> Result<Self, EngineError> {
        let mut base =
            Url::parse(address).map_err(|_| EngineError::InvalidAddress(address.to_string()))?;
        if base.host_str().is_none() {
            return Err(EngineError::InvalidAddress(address.to_string()));
        }
        // `Url::join` replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to build HTTP client for the ZAP API.");
                EngineError::Unreachable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { base, api_key: api_key.to_string(), http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Sends one GET to the JSON API.
    ///
    /// # Arguments
    /// * `path` - Endpoint path relative to the base URL.
    /// * `params` - Query parameters.
    ///
    /// # Returns
    /// The decoded JSON body. A non-2xx status becomes `EngineError::Api`
    /// carrying ZAP's own error message when it sent one.
    async fn call(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, EngineError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| EngineError::InvalidAddress(format!("{}{path}: {e}", self.base)))?;
        debug!(endpoint = path, "Calling ZAP API.");

        let response = self
            .http
            .get(url)
            .query(params)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(endpoint = path, status = %status, error = %e, "Could not read ZAP error body.");
                    String::new()
                }
            };
            let message = match serde_json::from_str::<ApiFault>(&body) {
                Ok(fault) => match fault.code {
                    Some(code) => format!("{code}: {}", fault.message),
                    None => fault.message,
                },
                Err(_) if body.trim().is_empty() => status.to_string(),
                Err(_) => body,
            };
            error!(endpoint = path, status = %status, message = %message, "ZAP API returned an error.");
            return Err(EngineError::Api { status: status.as_u16(), message });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn call_for_field(
        &self,
        path: &str,
        params: &[(&str, &str)],
        field: &str,
    ) -> Result<String, EngineError> {
        let body = self.call(path, params).await?;
        string_field(&body, field)
    }
}

/// Extracts `field` from a ZAP reply; ZAP encodes ids and percentages as strings.
fn string_field(body: &Value, field: &str) -> Result<String, EngineError> {
    match body.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(EngineError::Malformed(format!("missing '{field}' in {body}"))),
    }
}

// --- Operazioni del motore ---
// Engine operations

#[async_trait]
impl ScanEngine for ZapClient {
    async fn version(&self) -> Result<String, EngineError> {
        self.call_for_field("JSON/core/view/version/", &[], "version").await
    }

    /// Starts the spider on `url`.
    ///
    /// # Returns
    /// The spider job id ZAP assigned.
    async fn start_crawl(&self, url: &str) -> Result<JobId, EngineError> {
        let job = self
            .call_for_field("JSON/spider/action/scan/", &[("url", url)], "scan")
            .await?;
        info!(target_url = url, job = %job, "Spider started.");
        Ok(job)
    }

    async fn crawl_progress(&self, job: &JobId) -> Result<u8, EngineError> {
        let status = self
            .call_for_field("JSON/spider/view/status/", &[("scanId", job.as_str())], "status")
            .await?;
        parse_progress(&status)
    }

    async fn start_attack(&self, url: &str) -> Result<JobId, EngineError> {
        let job = self
            .call_for_field("JSON/ascan/action/scan/", &[("url", url)], "scan")
            .await?;
        info!(target_url = url, job = %job, "Active scan started.");
        Ok(job)
    }

    async fn attack_progress(&self, job: &JobId) -> Result<u8, EngineError> {
        let status = self
            .call_for_field("JSON/ascan/view/status/", &[("scanId", job.as_str())], "status")
            .await?;
        parse_progress(&status)
    }

    /// Fetches every alert recorded under `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Only alerts whose URL starts with this are returned.
    ///
    /// # Returns
    /// The raw alerts, with missing fields left as `None`.
    async fn list_findings(&self, base_url: &str) -> Result<Vec<RawAlert>, EngineError> {
        let body = self.call("JSON/core/view/alerts/", &[("baseurl", base_url)]).await?;
        let envelope: AlertsEnvelope = serde_json::from_value(body)
            .map_err(|e| EngineError::Malformed(format!("alerts payload: {e}")))?;
        info!(base_url, alerts = envelope.alerts.len(), "Fetched alerts from ZAP.");
        Ok(envelope.alerts)
    }
}
