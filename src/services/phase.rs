//! Single-phase execution against the scan engine.
//!
//! A phase runner drives exactly one named phase to completion or failure:
//! start the engine job, then poll its progress at a fixed interval until
//! 100% or the phase timeout. Polling suspends only the calling task;
//! unrelated scans are unaffected.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::AppConfig;
use crate::engine::{ConnectionStatus, JobHandle, RawAlert, ScanEngine};
use crate::errors::ScanError;

/// Poll cadence and per-phase budget, taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct PhaseSettings {
    pub poll_interval: Duration,
    pub phase_timeout: Duration,
}

impl PhaseSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            phase_timeout: config.phase_timeout(),
        }
    }
}

/// Which crawl the engine should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlKind {
    Traditional,
    Ajax,
}

impl CrawlKind {
    fn phase_name(&self) -> &'static str {
        match self {
            Self::Traditional => "spider",
            Self::Ajax => "ajax spider",
        }
    }
}

/// Verify the engine is up and can reach the target.
///
/// Succeeds iff both ends are reachable; a responsive engine that cannot
/// reach the target is a `ConnectionFailed`.
pub async fn run_connection_check(
    engine: &dyn ScanEngine,
    target_url: &str,
) -> Result<ConnectionStatus, ScanError> {
    let status = engine.verify_connection(target_url).await?;
    if !status.target_reachable {
        return Err(ScanError::ConnectionFailed(format!(
            "engine could not reach target {target_url}"
        )));
    }
    Ok(status)
}

/// Run one crawl phase to completion.
pub async fn run_crawl(
    engine: &dyn ScanEngine,
    kind: CrawlKind,
    target_url: &str,
    settings: &PhaseSettings,
) -> Result<(), ScanError> {
    let job = match kind {
        CrawlKind::Traditional => engine.start_spider(target_url).await?,
        CrawlKind::Ajax => engine.start_ajax_spider(target_url).await?,
    };
    poll_to_completion(engine, &job, settings, kind.phase_name()).await
}

/// Run the active-scan phase to completion, then pull the alert report.
pub async fn run_active_scan(
    engine: &dyn ScanEngine,
    target_url: &str,
    settings: &PhaseSettings,
) -> Result<Vec<RawAlert>, ScanError> {
    let job = engine.start_active_scan(target_url).await?;
    poll_to_completion(engine, &job, settings, "active scan").await?;
    Ok(engine.fetch_alerts(target_url).await?)
}

/// Poll a job until it reports 100%, the phase budget runs out, or the
/// engine errors. Engine errors during polling propagate unchanged.
async fn poll_to_completion(
    engine: &dyn ScanEngine,
    job: &JobHandle,
    settings: &PhaseSettings,
    phase: &'static str,
) -> Result<(), ScanError> {
    let deadline = Instant::now() + settings.phase_timeout;
    loop {
        let percent = engine.poll_status(job).await?;
        tracing::debug!(phase, percent, "Polled engine job");
        if percent >= 100 {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(ScanError::PhaseTimeout { phase });
        }
        tokio::time::sleep(settings.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::engine::EngineError;

    /// Engine double that scripts poll results and connection outcomes.
    struct ScriptedEngine {
        target_reachable: bool,
        poll_results: Mutex<VecDeque<u8>>,
    }

    impl ScriptedEngine {
        fn with_polls(polls: &[u8]) -> Self {
            Self {
                target_reachable: true,
                poll_results: Mutex::new(polls.iter().copied().collect()),
            }
        }
    }

    #[async_trait]
    impl ScanEngine for ScriptedEngine {
        async fn engine_version(&self) -> Result<String, EngineError> {
            Ok("2.14.0".to_string())
        }

        async fn verify_connection(
            &self,
            _target_url: &str,
        ) -> Result<ConnectionStatus, EngineError> {
            Ok(ConnectionStatus {
                engine_version: "2.14.0".to_string(),
                target_reachable: self.target_reachable,
            })
        }

        async fn start_spider(&self, _target_url: &str) -> Result<JobHandle, EngineError> {
            Ok(JobHandle::Spider("1".to_string()))
        }

        async fn start_ajax_spider(&self, _target_url: &str) -> Result<JobHandle, EngineError> {
            Ok(JobHandle::AjaxSpider)
        }

        async fn start_active_scan(&self, _target_url: &str) -> Result<JobHandle, EngineError> {
            Ok(JobHandle::ActiveScan("1".to_string()))
        }

        async fn poll_status(&self, _job: &JobHandle) -> Result<u8, EngineError> {
            // Repeat the last scripted value once the script runs out.
            let mut polls = self.poll_results.lock().unwrap();
            if polls.len() > 1 {
                Ok(polls.pop_front().unwrap())
            } else {
                Ok(*polls.front().unwrap())
            }
        }

        async fn fetch_alerts(&self, _target_url: &str) -> Result<Vec<RawAlert>, EngineError> {
            Ok(vec![])
        }
    }

    fn fast_settings() -> PhaseSettings {
        PhaseSettings {
            poll_interval: Duration::from_millis(5),
            phase_timeout: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn crawl_completes_when_engine_reports_100() {
        let engine = ScriptedEngine::with_polls(&[30, 70, 100]);
        let result = run_crawl(
            &engine,
            CrawlKind::Traditional,
            "http://example.test",
            &fast_settings(),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn crawl_times_out_when_progress_stalls() {
        let engine = ScriptedEngine::with_polls(&[50]);
        let err = run_crawl(
            &engine,
            CrawlKind::Traditional,
            "http://example.test",
            &fast_settings(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScanError::PhaseTimeout { phase: "spider" }));
    }

    #[tokio::test]
    async fn connection_check_fails_when_target_unreachable() {
        let engine = ScriptedEngine {
            target_reachable: false,
            poll_results: Mutex::new(VecDeque::new()),
        };
        let err = run_connection_check(&engine, "http://example.test")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn active_scan_returns_alert_report() {
        let engine = ScriptedEngine::with_polls(&[100]);
        let alerts = run_active_scan(&engine, "http://example.test", &fast_settings())
            .await
            .unwrap();
        assert!(alerts.is_empty());
    }
}
