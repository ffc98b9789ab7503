//! Vulnerability entity and severity normalization.
//!
//! Findings are write-once: ingested verbatim from the engine's alert
//! report at the end of the active-scan phase, never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::engine::RawAlert;

// -- Enums matching PostgreSQL --

/// Engine-reported risk, ordered `informational < low < medium < high`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord,
)]
#[sqlx(type_name = "risk_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Informational,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Normalize the engine's free-text risk string.
    ///
    /// Unrecognized values degrade to `Informational` rather than dropping
    /// the finding.
    pub fn from_engine(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            "informational" => Self::Informational,
            _ => Self::Informational,
        }
    }
}

/// Engine-reported confidence, ordered `low < medium < high`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord,
)]
#[sqlx(type_name = "confidence_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Normalize the engine's free-text confidence string; unrecognized
    /// values degrade to `Low`.
    pub fn from_engine(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Low,
        }
    }
}

// -- Core Vulnerability --

/// One discovered issue, attached to exactly one scan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vulnerability {
    pub id: Uuid,
    pub scan_id: Uuid,
    pub name: String,
    pub description: String,
    pub url: String,
    pub risk: RiskLevel,
    pub confidence: ConfidenceLevel,
    pub created_at: DateTime<Utc>,
}

/// A normalized finding ready for persistence, or returned inline by the
/// synchronous active-scan probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVulnerability {
    pub name: String,
    pub description: String,
    pub url: String,
    pub risk: RiskLevel,
    pub confidence: ConfidenceLevel,
}

impl NewVulnerability {
    /// Map one raw engine alert into a normalized finding. Name,
    /// description, and URL are copied verbatim.
    pub fn from_alert(alert: &RawAlert) -> Self {
        Self {
            name: alert.name.clone(),
            description: alert.description.clone(),
            url: alert.url.clone(),
            risk: RiskLevel::from_engine(&alert.risk),
            confidence: ConfidenceLevel::from_engine(&alert.confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Informational < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn confidence_levels_are_ordered() {
        assert!(ConfidenceLevel::Low < ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
    }

    #[test]
    fn risk_normalization_is_case_insensitive() {
        assert_eq!(RiskLevel::from_engine("High"), RiskLevel::High);
        assert_eq!(RiskLevel::from_engine("MEDIUM"), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_engine(" low "), RiskLevel::Low);
        assert_eq!(
            RiskLevel::from_engine("Informational"),
            RiskLevel::Informational
        );
    }

    #[test]
    fn unrecognized_risk_degrades_to_informational() {
        assert_eq!(RiskLevel::from_engine("Critical"), RiskLevel::Informational);
        assert_eq!(RiskLevel::from_engine(""), RiskLevel::Informational);
    }

    #[test]
    fn unrecognized_confidence_degrades_to_low() {
        // The engine also reports "False Positive" and "Confirmed"; both fall
        // outside the ordered set and degrade.
        assert_eq!(
            ConfidenceLevel::from_engine("False Positive"),
            ConfidenceLevel::Low
        );
        assert_eq!(
            ConfidenceLevel::from_engine("Confirmed"),
            ConfidenceLevel::Low
        );
    }

    #[test]
    fn alert_fields_copied_verbatim() {
        let alert = RawAlert {
            name: "SQL Injection".to_string(),
            description: "Parameter `q` is injectable.".to_string(),
            url: "http://example.test/search?q=1".to_string(),
            risk: "High".to_string(),
            confidence: "Medium".to_string(),
        };
        let vuln = NewVulnerability::from_alert(&alert);
        assert_eq!(vuln.name, "SQL Injection");
        assert_eq!(vuln.description, "Parameter `q` is injectable.");
        assert_eq!(vuln.url, "http://example.test/search?q=1");
        assert_eq!(vuln.risk, RiskLevel::High);
        assert_eq!(vuln.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn risk_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::High).unwrap(),
            "\"high\""
        );
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::Medium).unwrap(),
            "\"medium\""
        );
    }
}
