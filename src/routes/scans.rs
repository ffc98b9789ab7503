//! Scan routes: submission and retrieval of persisted scans.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::models::scan::{Scan, ScanVariant, ScanWithFindings};
use crate::services::orchestrator;
use crate::services::phase::PhaseSettings;
use crate::AppState;

/// Request body for submitting a scan.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScanRequest {
    #[validate(url(message = "target_url must be a valid URL"))]
    pub target_url: String,
    /// Which assessment to run; defaults to the full chain.
    #[serde(default)]
    pub variant: ScanVariant,
}

/// POST /api/v1/scans — accept a scan, run it in the background, return
/// the pending record immediately.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateScanRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Scan>>), AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let scan = orchestrator::submit(
        state.store.clone(),
        state.engine.clone(),
        &body.target_url,
        body.variant,
        PhaseSettings::from_config(&state.config),
    )
    .await?;

    Ok((StatusCode::CREATED, ApiResponse::success(scan)))
}

/// GET /api/v1/scans — all scans, latest first, each with findings.
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ScanWithFindings>>>, AppError> {
    let scans = state.store.list_scans().await?;
    Ok(ApiResponse::success(scans))
}

/// GET /api/v1/scans/{id} — one scan with findings.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScanWithFindings>>, AppError> {
    let scan = state.store.get_scan(id).await?;
    Ok(ApiResponse::success(scan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_malformed_url() {
        let body = CreateScanRequest {
            target_url: "not a url".to_string(),
            variant: ScanVariant::Full,
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn create_request_accepts_http_url() {
        let body = CreateScanRequest {
            target_url: "http://example.test".to_string(),
            variant: ScanVariant::Full,
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn variant_field_is_optional() {
        let body: CreateScanRequest =
            serde_json::from_str(r#"{"target_url": "http://example.test"}"#).unwrap();
        assert_eq!(body.variant, ScanVariant::Full);
    }
}
