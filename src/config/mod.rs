use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub zap_base_url: String,
    pub zap_api_key: Option<String>,
    pub scan_poll_interval_ms: u64,
    pub scan_phase_timeout_secs: u64,
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("BACKEND_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            zap_base_url: env::var("ZAP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            zap_api_key: env::var("ZAP_API_KEY").ok().filter(|k| !k.is_empty()),
            scan_poll_interval_ms: env::var("SCAN_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .unwrap_or(2000),
            scan_phase_timeout_secs: env::var("SCAN_PHASE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        })
    }

    /// Interval between engine progress polls within a phase.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.scan_poll_interval_ms)
    }

    /// Wall-clock budget for a single crawl or active-scan phase.
    pub fn phase_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_phase_timeout_secs)
    }
}
