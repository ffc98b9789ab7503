//! Durable storage of scan records and their findings.
//!
//! The store is the only shared mutable state between scan tasks and API
//! handlers. Each scan has exactly one owning writer (its orchestrator
//! task); reads may happen concurrently from any handler. Status updates
//! are guarded by the lifecycle graph in [`ScanStatus::can_transition`].

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::scan::{Scan, ScanStatus, ScanWithFindings};
use crate::models::vulnerability::{NewVulnerability, Vulnerability};

/// Repository seam injected into the orchestrator and the API handlers.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Create a scan record in `pending` for the given target.
    async fn create_scan(&self, target_url: &str) -> Result<Scan, AppError>;

    /// Load one scan with its findings, report-ordered.
    async fn get_scan(&self, id: Uuid) -> Result<ScanWithFindings, AppError>;

    /// All scans, newest first, each with its findings.
    async fn list_scans(&self) -> Result<Vec<ScanWithFindings>, AppError>;

    /// Move a pending scan to `running`.
    async fn mark_running(&self, id: Uuid) -> Result<(), AppError>;

    /// Move a running scan to a terminal status, stamping `ended_at` and
    /// recording the failure message, if any.
    async fn finish_scan(
        &self,
        id: Uuid,
        status: ScanStatus,
        error: Option<&str>,
    ) -> Result<(), AppError>;

    /// Attach ingested findings to a scan, preserving report order.
    /// All-or-nothing: a mid-batch failure persists no findings.
    async fn add_vulnerabilities(
        &self,
        scan_id: Uuid,
        findings: &[NewVulnerability],
    ) -> Result<(), AppError>;
}

/// PostgreSQL-backed store owning a connection pool.
#[derive(Debug, Clone)]
pub struct PgScanStore {
    pool: PgPool,
}

impl PgScanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_status(&self, id: Uuid) -> Result<ScanStatus, AppError> {
        sqlx::query_scalar::<_, ScanStatus>("SELECT status FROM scans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Scan {id} not found")))
    }
}

#[async_trait]
impl ScanStore for PgScanStore {
    async fn create_scan(&self, target_url: &str) -> Result<Scan, AppError> {
        let scan = sqlx::query_as::<_, Scan>(
            r#"
            INSERT INTO scans (id, target_url, status, started_at)
            VALUES ($1, $2, 'pending', NOW())
            RETURNING id, target_url, status, error, started_at, ended_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(target_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(scan)
    }

    async fn get_scan(&self, id: Uuid) -> Result<ScanWithFindings, AppError> {
        let scan = sqlx::query_as::<_, Scan>(
            "SELECT id, target_url, status, error, started_at, ended_at
             FROM scans WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Scan {id} not found")))?;

        let vulnerabilities = sqlx::query_as::<_, Vulnerability>(
            "SELECT id, scan_id, name, description, url, risk, confidence, created_at
             FROM vulnerabilities WHERE scan_id = $1 ORDER BY seq",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ScanWithFindings {
            scan,
            vulnerabilities,
        })
    }

    async fn list_scans(&self) -> Result<Vec<ScanWithFindings>, AppError> {
        let scans = sqlx::query_as::<_, Scan>(
            "SELECT id, target_url, status, error, started_at, ended_at
             FROM scans ORDER BY started_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = scans.iter().map(|s| s.id).collect();
        let all_vulnerabilities = sqlx::query_as::<_, Vulnerability>(
            "SELECT id, scan_id, name, description, url, risk, confidence, created_at
             FROM vulnerabilities WHERE scan_id = ANY($1) ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_scan: HashMap<Uuid, Vec<Vulnerability>> = HashMap::new();
        for vuln in all_vulnerabilities {
            by_scan.entry(vuln.scan_id).or_default().push(vuln);
        }

        Ok(scans
            .into_iter()
            .map(|scan| {
                let vulnerabilities = by_scan.remove(&scan.id).unwrap_or_default();
                ScanWithFindings {
                    scan,
                    vulnerabilities,
                }
            })
            .collect())
    }

    async fn mark_running(&self, id: Uuid) -> Result<(), AppError> {
        let current = self.load_status(id).await?;
        if !ScanStatus::can_transition(current, ScanStatus::Running) {
            return Err(AppError::InvalidTransition(format!(
                "Cannot move scan {id} from {current:?} to Running"
            )));
        }
        sqlx::query("UPDATE scans SET status = 'running' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn finish_scan(
        &self,
        id: Uuid,
        status: ScanStatus,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        if !status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "{status:?} is not a terminal status"
            )));
        }
        let current = self.load_status(id).await?;
        if !ScanStatus::can_transition(current, status) {
            return Err(AppError::InvalidTransition(format!(
                "Cannot move scan {id} from {current:?} to {status:?}"
            )));
        }
        sqlx::query("UPDATE scans SET status = $1, error = $2, ended_at = NOW() WHERE id = $3")
            .bind(status)
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_vulnerabilities(
        &self,
        scan_id: Uuid,
        findings: &[NewVulnerability],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for finding in findings {
            sqlx::query(
                r#"
                INSERT INTO vulnerabilities (id, scan_id, name, description, url, risk, confidence)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(scan_id)
            .bind(&finding.name)
            .bind(&finding.description)
            .bind(&finding.url)
            .bind(finding.risk)
            .bind(finding.confidence)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
