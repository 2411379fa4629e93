// src/gateway/mod.rs

//! HTTP surface: scan requests, report downloads and the model-backed checks.

pub mod download;
pub mod pool;

use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::app::App;
use crate::core::models::{ScanOutcome, ScanTarget};
use crate::core::probe::ProbePolicy;
use crate::gateway::pool::CompletedScan;
use crate::llm::{self, LlmError};

use self::download::{resolve_report_path, DownloadError};

/// Every report is offered to the browser under the same file name.
const CONTENT_DISPOSITION: &str = "attachment; filename=\"SecureNexus_Scan_Report.pdf\"";
pub const REPORT_FILE_HEADER: &str = "x-report-file";
pub const SCAN_OUTCOME_HEADER: &str = "x-scan-outcome";

const MAX_ERROR_CHARS: usize = 300;

// --- Instradamento ---
// Routing

/// Builds the HTTP router over the shared application state.
///
/// # Arguments
/// * `app` - State shared by every handler.
///
/// # Returns
/// A `Router` with the scan, download, model and health routes. When a static
/// directory is configured it also serves the frontend for any other path.
pub fn router(app: Arc<App>) -> Router {
    let static_dir = app.static_dir.clone();
    let router = Router::new()
        .route("/scan-web", post(scan_web))
        .route("/api/download-report", get(download_report))
        .route("/api/analyze", post(analyze_code))
        .route("/api/phishing-check", post(phishing_check))
        .route("/api/health", get(health))
        .with_state(app);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

// --- Risposte ---
// Responses

/// JSON `{ "error": ... }` body, truncated to a bounded length.
fn error_response(status: StatusCode, message: impl AsRef<str>) -> Response {
    let message: String = message.as_ref().chars().take(MAX_ERROR_CHARS).collect();
    (status, Json(json!({ "error": message }))).into_response()
}

/// Wraps report bytes as an attachment.
///
/// # Arguments
/// * `bytes` - The rendered report.
/// * `content_type` - MIME type of the renderer that produced it.
/// * `stored_as` - File name under the report directory, echoed in `x-report-file`.
/// * `outcome` - Scan outcome label, echoed in `x-scan-outcome`.
///
/// # Returns
/// A `200 OK` response with the download headers set.
fn document_response(bytes: Vec<u8>, content_type: &'static str, stored_as: &str, outcome: &str) -> Response {
    let mut response = (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, HeaderValue::from_static(CONTENT_DISPOSITION)),
        ],
        bytes,
    )
        .into_response();

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(stored_as) {
        headers.insert(HeaderName::from_static(REPORT_FILE_HEADER), value);
    }
    if let Ok(value) = HeaderValue::from_str(outcome) {
        headers.insert(HeaderName::from_static(SCAN_OUTCOME_HEADER), value);
    }
    response
}

// --- Scansione ---
// Scan

#[derive(Debug, Deserialize)]
pub struct ScanForm {
    pub url: String,
}

/// `POST /scan-web`: validates the target, runs the scan on the pool and
/// returns the stored report.
///
/// The scan and the report write both happen inside the pool task, so a client
/// that disconnects early still leaves a downloadable report behind.
///
/// # Returns
/// The report as an attachment, `400` for a bad target, `503` when the engine
/// cannot be reached, or `500` when scanning or rendering failed.
async fn scan_web(State(app): State<Arc<App>>, Form(form): Form<ScanForm>) -> Response {
    let target = match ScanTarget::parse(&form.url) {
        Ok(target) => target,
        Err(e) => {
            warn!(input = %form.url, error = %e, "Rejected scan request.");
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid target URL format. Example: http://example.com",
            );
        }
    };

    if !app.probe.is_reachable(ProbePolicy::once()).await {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "ZAP is not reachable. Please start ZAP and try again.",
        );
    }

    info!(target_url = %target, free_slots = app.pool.available(), "Scan requested.");
    let CompletedScan { outcome, report } = app.pool.run(target.as_str().to_string()).await;

    match &outcome {
        ScanOutcome::Success(_) | ScanOutcome::TimedOut(_) => {}
        ScanOutcome::InvalidTarget => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid target URL format.");
        }
        ScanOutcome::EngineUnreachable => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Could not connect to ZAP. Check that it is running.",
            );
        }
        ScanOutcome::EngineError(message) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Scanning failed: {message}"));
        }
    }

    match report {
        Some(Ok(stored)) => {
            info!(target_url = %target, report = %stored.file_name, outcome = outcome.label(), "Report ready.");
            document_response(stored.bytes, app.reports.content_type(), &stored.file_name, outcome.label())
        }
        Some(Err(e)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Report generation failed: {e}"))
        }
        None => {
            error!(target_url = %target, "Scan finished without a stored report.");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Report generation failed: no report stored.")
        }
    }
}

// --- Download ---

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub path: String,
}

/// `GET /api/download-report?path=<name>`: serves a previously stored report.
///
/// # Returns
/// The report as an attachment, `400` for names that are not plain report file
/// names, or `404` when no such report exists.
async fn download_report(State(app): State<Arc<App>>, Query(query): Query<DownloadQuery>) -> Response {
    let path = match resolve_report_path(app.reports.dir(), &query.path).await {
        Ok(path) => path,
        Err(DownloadError::InvalidName) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid report name.");
        }
        Err(DownloadError::NotFound) => {
            return error_response(StatusCode::NOT_FOUND, "Report file not found.");
        }
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => document_response(bytes, app.reports.content_type(), &query.path, "stored"),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read stored report.");
            error_response(StatusCode::NOT_FOUND, "Report file not found.")
        }
    }
}

// --- Controlli con modello linguistico ---
// Language model checks

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PhishingRequest {
    pub message: String,
}

fn llm_error_response(e: LlmError) -> Response {
    match e {
        LlmError::EmptyInput => error_response(StatusCode::BAD_REQUEST, "Input must not be empty."),
        other => {
            error!(error = %other, "Language model request failed.");
            error_response(StatusCode::BAD_GATEWAY, other.to_string())
        }
    }
}

fn model_unavailable() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Language model is not configured.")
}

async fn analyze_code(State(app): State<Arc<App>>, Json(request): Json<CodeRequest>) -> Response {
    let Some(model) = app.model.as_deref() else {
        return model_unavailable();
    };
    match llm::analyze_code(model, &request.code).await {
        Ok(analysis) => Json(json!({ "analysis": analysis })).into_response(),
        Err(e) => llm_error_response(e),
    }
}

async fn phishing_check(State(app): State<Arc<App>>, Json(request): Json<PhishingRequest>) -> Response {
    let Some(model) = app.model.as_deref() else {
        return model_unavailable();
    };
    match llm::check_phishing(model, &request.message).await {
        Ok(result) => Json(json!({ "result": result })).into_response(),
        Err(e) => llm_error_response(e),
    }
}

// --- Stato ---
// Health

async fn health(State(app): State<Arc<App>>) -> Response {
    let version = app.probe.engine_version(ProbePolicy::once()).await;
    Json(json!({
        "status": "ok",
        "engine_reachable": version.is_some(),
        "engine_version": version,
        "scan_slots_free": app.pool.available(),
        "scan_slots_total": app.pool.size(),
    }))
    .into_response()
}
