//! Control-API client for the external scanning engine.
//!
//! The engine performs the actual crawling and vulnerability probing; this
//! module only drives it and normalizes what it reports back. `ScanEngine`
//! is the seam the orchestrator depends on, so scan logic can run against
//! a scripted fake in tests.

pub mod zap;

use async_trait::async_trait;
use serde::Deserialize;

pub use zap::ZapClient;

/// Outcome of the reachability check: the engine answered, and it did or
/// did not manage to reach the target.
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub engine_version: String,
    pub target_reachable: bool,
}

/// Opaque reference to an in-progress engine job, used for polling.
///
/// The ajax spider is a singleton on the engine side and has no job id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobHandle {
    Spider(String),
    AjaxSpider,
    ActiveScan(String),
}

/// One alert exactly as reported by the engine, prior to normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAlert {
    #[serde(rename = "alert")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub confidence: String,
}

/// Failures of a single engine control call. No retries at this layer;
/// callers decide retry policy.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine could not be reached at all (connect/timeout failure).
    #[error("scanning engine unreachable: {0}")]
    Unreachable(String),

    /// The engine answered with an error status or an unusable body.
    #[error("scanning engine error: {0}")]
    Engine(String),
}

/// Control operations the orchestration core needs from the engine.
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// Engine self-identification, used by the readiness probe.
    async fn engine_version(&self) -> Result<String, EngineError>;

    /// Check that the engine is up and can reach the target URL.
    async fn verify_connection(&self, target_url: &str)
        -> Result<ConnectionStatus, EngineError>;

    async fn start_spider(&self, target_url: &str) -> Result<JobHandle, EngineError>;

    async fn start_ajax_spider(&self, target_url: &str) -> Result<JobHandle, EngineError>;

    async fn start_active_scan(&self, target_url: &str) -> Result<JobHandle, EngineError>;

    /// Percent complete for a running job, normalized to 0..=100.
    async fn poll_status(&self, job: &JobHandle) -> Result<u8, EngineError>;

    /// Retrieve all alerts the engine has recorded for a target.
    async fn fetch_alerts(&self, target_url: &str) -> Result<Vec<RawAlert>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_alert_deserializes_from_engine_report() {
        // The engine names the title field "alert" in its JSON report.
        let json = serde_json::json!({
            "alert": "X-Content-Type-Options Header Missing",
            "description": "The Anti-MIME-Sniffing header was not set.",
            "url": "http://example.test/",
            "risk": "Low",
            "confidence": "Medium",
            "pluginId": "10021"
        });
        let alert: RawAlert = serde_json::from_value(json).unwrap();
        assert_eq!(alert.name, "X-Content-Type-Options Header Missing");
        assert_eq!(alert.risk, "Low");
        assert_eq!(alert.confidence, "Medium");
    }

    #[test]
    fn raw_alert_tolerates_missing_optional_fields() {
        let json = serde_json::json!({ "alert": "Server Leaks Version" });
        let alert: RawAlert = serde_json::from_value(json).unwrap();
        assert_eq!(alert.name, "Server Leaks Version");
        assert!(alert.description.is_empty());
        assert!(alert.risk.is_empty());
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::Unreachable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "scanning engine unreachable: connection refused"
        );
    }
}
