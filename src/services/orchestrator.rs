//! Scan orchestration: lifecycle state machine and dispatch.
//!
//! One spawned task owns one scan end-to-end: it sequences the variant's
//! phases against the engine and records the outcome on the scan record.
//! A phase failure terminates the run immediately (no retry, no
//! best-effort continuation) and is written back as the terminal status;
//! it never propagates out of the task.

use std::sync::Arc;

use uuid::Uuid;

use crate::engine::ScanEngine;
use crate::errors::AppError;
use crate::models::scan::{Phase, Scan, ScanStatus, ScanVariant};
use crate::models::vulnerability::NewVulnerability;
use crate::services::phase::{self, CrawlKind, PhaseSettings};
use crate::services::store::ScanStore;

/// Accept a scan request: create the record in `pending`, schedule the
/// orchestrator as an independent task, and return without waiting for
/// any phase to execute.
pub async fn submit(
    store: Arc<dyn ScanStore>,
    engine: Arc<dyn ScanEngine>,
    target_url: &str,
    variant: ScanVariant,
    settings: PhaseSettings,
) -> Result<Scan, AppError> {
    let scan = store.create_scan(target_url).await?;
    tracing::info!(scan_id = %scan.id, target_url, variant = ?variant, "Scan accepted");

    let scan_id = scan.id;
    let url = scan.target_url.clone();
    tokio::spawn(async move {
        run_scan(store.as_ref(), engine.as_ref(), scan_id, &url, variant, settings).await;
    });

    Ok(scan)
}

/// Drive one scan from `pending` to a terminal status.
///
/// Never returns an error: every failure ends up either on the scan record
/// or in the log.
pub async fn run_scan(
    store: &dyn ScanStore,
    engine: &dyn ScanEngine,
    scan_id: Uuid,
    target_url: &str,
    variant: ScanVariant,
    settings: PhaseSettings,
) {
    if let Err(e) = store.mark_running(scan_id).await {
        tracing::error!(scan_id = %scan_id, error = %e, "Could not move scan to running");
        return;
    }

    let recorded = match run_phases(store, engine, scan_id, target_url, variant, &settings).await
    {
        Ok(findings) => {
            tracing::info!(scan_id = %scan_id, findings, "Scan completed");
            store
                .finish_scan(scan_id, ScanStatus::Completed, None)
                .await
        }
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(scan_id = %scan_id, error = %message, "Scan failed");
            store
                .finish_scan(scan_id, ScanStatus::Failed, Some(&message))
                .await
        }
    };

    if let Err(e) = recorded {
        tracing::error!(scan_id = %scan_id, error = %e, "Could not record terminal scan status");
    }
}

/// Execute the variant's phases in order, fail-fast. Returns the number of
/// findings ingested.
async fn run_phases(
    store: &dyn ScanStore,
    engine: &dyn ScanEngine,
    scan_id: Uuid,
    target_url: &str,
    variant: ScanVariant,
    settings: &PhaseSettings,
) -> Result<usize, AppError> {
    let mut ingested = 0usize;

    for step in variant.phases() {
        match step {
            Phase::ConnectionCheck => {
                let status = phase::run_connection_check(engine, target_url).await?;
                tracing::info!(
                    scan_id = %scan_id,
                    engine_version = %status.engine_version,
                    "Connection check passed"
                );
            }
            Phase::Spider => {
                tracing::info!(scan_id = %scan_id, "Starting spider phase");
                phase::run_crawl(engine, CrawlKind::Traditional, target_url, settings).await?;
            }
            Phase::AjaxSpider => {
                tracing::info!(scan_id = %scan_id, "Starting ajax spider phase");
                phase::run_crawl(engine, CrawlKind::Ajax, target_url, settings).await?;
            }
            Phase::ActiveScan => {
                tracing::info!(scan_id = %scan_id, "Starting active scan phase");
                let alerts = phase::run_active_scan(engine, target_url, settings).await?;
                let findings: Vec<NewVulnerability> =
                    alerts.iter().map(NewVulnerability::from_alert).collect();
                store.add_vulnerabilities(scan_id, &findings).await?;
                ingested += findings.len();
            }
        }
    }

    Ok(ingested)
}
