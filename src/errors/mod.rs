//! Unified error handling with consistent API response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::engine::EngineError;

/// Error detail in the API response envelope.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Consistent JSON envelope for all API responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a successful result in the envelope.
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            data: Some(data),
            error: None,
        })
    }

    /// Wrap an error in the envelope.
    pub fn error(code: &str, message: &str) -> Json<Self> {
        Json(Self {
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        })
    }
}

/// Failure of a single scan phase while driving the external engine.
///
/// These never crash the owning scan task; the orchestrator converts them
/// into a terminal `failed` status on the scan record.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scanning engine unreachable: {0}")]
    EngineUnreachable(String),

    #[error("scanning engine error: {0}")]
    Engine(String),

    #[error("{phase} phase timed out")]
    PhaseTimeout { phase: &'static str },

    #[error("connection check failed: {0}")]
    ConnectionFailed(String),
}

impl From<EngineError> for ScanError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unreachable(msg) => Self::EngineUnreachable(msg),
            EngineError::Engine(msg) => Self::Engine(msg),
        }
    }
}

/// Application error type mapping to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Check if this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::InvalidTransition(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_TRANSITION", msg.clone())
            }
            AppError::Scan(err) => {
                tracing::warn!(error = %err, "Engine-side failure surfaced to caller");
                let (status, code) = match err {
                    ScanError::EngineUnreachable(_) => {
                        (StatusCode::BAD_GATEWAY, "ENGINE_UNREACHABLE")
                    }
                    ScanError::Engine(_) => (StatusCode::BAD_GATEWAY, "ENGINE_ERROR"),
                    ScanError::PhaseTimeout { .. } => {
                        (StatusCode::GATEWAY_TIMEOUT, "PHASE_TIMEOUT")
                    }
                    ScanError::ConnectionFailed(_) => {
                        (StatusCode::BAD_GATEWAY, "CONNECTION_FAILED")
                    }
                };
                (status, code, err.to_string())
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()> {
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message,
            }),
        };

        (status, Json(body)).into_response()
    }
}
