//! Single-phase probe routes.
//!
//! Each probe runs exactly one phase synchronously against the engine and
//! returns its outcome in the response; no scan record is persisted. This
//! is a deliberately separate capability from the persisted full-scan
//! workflow, not a variation of it.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::models::vulnerability::NewVulnerability;
use crate::services::phase::{self, CrawlKind, PhaseSettings};
use crate::AppState;

/// Request body shared by all probe endpoints.
#[derive(Debug, Deserialize, Validate)]
pub struct ProbeRequest {
    #[validate(url(message = "target_url must be a valid URL"))]
    pub target_url: String,
}

/// Outcome of the connection probe.
#[derive(Debug, Serialize)]
pub struct ConnectionReport {
    pub engine_version: String,
    pub target_reachable: bool,
}

/// Outcome of a crawl probe.
#[derive(Debug, Serialize)]
pub struct CrawlReport {
    pub phase: &'static str,
    pub completed: bool,
}

/// Outcome of the active-scan probe, findings inline.
#[derive(Debug, Serialize)]
pub struct ActiveScanReport {
    pub vulnerabilities: Vec<NewVulnerability>,
}

/// POST /api/v1/probes/verify-connection
pub async fn verify_connection(
    State(state): State<AppState>,
    Json(body): Json<ProbeRequest>,
) -> Result<Json<ApiResponse<ConnectionReport>>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let status = phase::run_connection_check(state.engine.as_ref(), &body.target_url).await?;
    Ok(ApiResponse::success(ConnectionReport {
        engine_version: status.engine_version,
        target_reachable: status.target_reachable,
    }))
}

/// POST /api/v1/probes/spider-scan
pub async fn spider_scan(
    State(state): State<AppState>,
    Json(body): Json<ProbeRequest>,
) -> Result<Json<ApiResponse<CrawlReport>>, AppError> {
    run_crawl_probe(&state, &body, CrawlKind::Traditional).await
}

/// POST /api/v1/probes/ajax-spider-scan
pub async fn ajax_spider_scan(
    State(state): State<AppState>,
    Json(body): Json<ProbeRequest>,
) -> Result<Json<ApiResponse<CrawlReport>>, AppError> {
    run_crawl_probe(&state, &body, CrawlKind::Ajax).await
}

async fn run_crawl_probe(
    state: &AppState,
    body: &ProbeRequest,
    kind: CrawlKind,
) -> Result<Json<ApiResponse<CrawlReport>>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let settings = PhaseSettings::from_config(&state.config);
    phase::run_crawl(state.engine.as_ref(), kind, &body.target_url, &settings).await?;

    let phase = match kind {
        CrawlKind::Traditional => "spider",
        CrawlKind::Ajax => "ajax-spider",
    };
    Ok(ApiResponse::success(CrawlReport {
        phase,
        completed: true,
    }))
}

/// POST /api/v1/probes/active-scan — runs the probe and returns normalized
/// findings inline without persisting them.
pub async fn active_scan(
    State(state): State<AppState>,
    Json(body): Json<ProbeRequest>,
) -> Result<Json<ApiResponse<ActiveScanReport>>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let settings = PhaseSettings::from_config(&state.config);
    let alerts =
        phase::run_active_scan(state.engine.as_ref(), &body.target_url, &settings).await?;
    let vulnerabilities = alerts.iter().map(NewVulnerability::from_alert).collect();

    Ok(ApiResponse::success(ActiveScanReport { vulnerabilities }))
}
