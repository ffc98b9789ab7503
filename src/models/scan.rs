//! Scan entity and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::vulnerability::Vulnerability;

// -- Enums matching PostgreSQL --

/// Lifecycle status of a scan. `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "scan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check whether a status transition is valid per the lifecycle graph.
    pub fn can_transition(from: Self, to: Self) -> bool {
        matches!(
            (from, to),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

/// Which ordered subsequence of phases a scan runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanVariant {
    /// Reachability check only.
    Connection,
    /// Reachability check plus traditional crawl.
    Spider,
    /// Reachability check plus active probing and alert ingestion.
    Active,
    /// The whole assessment: both crawls, then active probing.
    #[default]
    Full,
}

/// One discrete step of an assessment, executed against the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ConnectionCheck,
    Spider,
    AjaxSpider,
    ActiveScan,
}

impl ScanVariant {
    /// The phases this variant runs, in execution order.
    pub fn phases(&self) -> &'static [Phase] {
        match self {
            Self::Connection => &[Phase::ConnectionCheck],
            Self::Spider => &[Phase::ConnectionCheck, Phase::Spider],
            Self::Active => &[Phase::ConnectionCheck, Phase::ActiveScan],
            Self::Full => &[
                Phase::ConnectionCheck,
                Phase::Spider,
                Phase::AjaxSpider,
                Phase::ActiveScan,
            ],
        }
    }
}

// -- Core Scan --

/// One requested assessment of a target URL.
///
/// `id` and `target_url` are immutable after creation; `ended_at` is set
/// exactly when the status becomes terminal; `error` carries the message of
/// the phase failure that terminated a failed scan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Scan {
    pub id: Uuid,
    pub target_url: String,
    pub status: ScanStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Scan with its attached findings, as served to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct ScanWithFindings {
    #[serde(flatten)]
    pub scan: Scan,
    pub vulnerabilities: Vec<Vulnerability>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Valid transitions --

    #[test]
    fn pending_to_running() {
        assert!(ScanStatus::can_transition(
            ScanStatus::Pending,
            ScanStatus::Running
        ));
    }

    #[test]
    fn running_to_completed() {
        assert!(ScanStatus::can_transition(
            ScanStatus::Running,
            ScanStatus::Completed
        ));
    }

    #[test]
    fn running_to_failed() {
        assert!(ScanStatus::can_transition(
            ScanStatus::Running,
            ScanStatus::Failed
        ));
    }

    // -- Invalid transitions --

    #[test]
    fn pending_to_completed_invalid() {
        assert!(!ScanStatus::can_transition(
            ScanStatus::Pending,
            ScanStatus::Completed
        ));
    }

    #[test]
    fn terminal_statuses_never_transition() {
        for from in [ScanStatus::Completed, ScanStatus::Failed] {
            for to in [
                ScanStatus::Pending,
                ScanStatus::Running,
                ScanStatus::Completed,
                ScanStatus::Failed,
            ] {
                assert!(
                    !ScanStatus::can_transition(from, to),
                    "Expected {from:?} → {to:?} to be invalid"
                );
            }
        }
    }

    #[test]
    fn terminal_flags() {
        assert!(!ScanStatus::Pending.is_terminal());
        assert!(!ScanStatus::Running.is_terminal());
        assert!(ScanStatus::Completed.is_terminal());
        assert!(ScanStatus::Failed.is_terminal());
    }

    // -- Serialization --

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ScanStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&ScanStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn variant_defaults_to_full() {
        assert_eq!(ScanVariant::default(), ScanVariant::Full);
    }

    #[test]
    fn variant_deserializes_lowercase() {
        let v: ScanVariant = serde_json::from_str("\"spider\"").unwrap();
        assert_eq!(v, ScanVariant::Spider);
    }

    // -- Phase sequences --

    #[test]
    fn full_variant_runs_every_phase_in_order() {
        assert_eq!(
            ScanVariant::Full.phases(),
            &[
                Phase::ConnectionCheck,
                Phase::Spider,
                Phase::AjaxSpider,
                Phase::ActiveScan
            ]
        );
    }

    #[test]
    fn every_variant_starts_with_connection_check() {
        for variant in [
            ScanVariant::Connection,
            ScanVariant::Spider,
            ScanVariant::Active,
            ScanVariant::Full,
        ] {
            assert_eq!(variant.phases().first(), Some(&Phase::ConnectionCheck));
        }
    }

    #[test]
    fn active_variant_skips_crawls() {
        assert!(!ScanVariant::Active.phases().contains(&Phase::Spider));
        assert!(!ScanVariant::Active.phases().contains(&Phase::AjaxSpider));
    }
}
