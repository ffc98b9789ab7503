//! OWASP ZAP implementation of the engine control API.
//!
//! Talks to the ZAP daemon's JSON API (`/JSON/<component>/<kind>/<op>/`).
//! Every operation is a GET with query parameters; the API key, when
//! configured, rides along as the `apikey` parameter.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AppConfig;

use super::{ConnectionStatus, EngineError, JobHandle, RawAlert, ScanEngine};

/// Per-request timeout for engine control calls. Long-running work happens
/// engine-side; individual control calls are expected to answer quickly.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a single ZAP daemon.
#[derive(Debug, Clone)]
pub struct ZapClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ZapClient {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(&config.zap_base_url, config.zap_api_key.clone())
    }

    pub fn new(base_url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Issue one control call and decode its JSON body.
    async fn call(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, EngineError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut query: Vec<(&str, &str)> = params.to_vec();
        if let Some(key) = &self.api_key {
            query.push(("apikey", key));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Engine(format!(
                "{path} returned HTTP {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::Engine(format!("{path} returned invalid JSON: {e}")))
    }
}

/// Transport-level failures mean the engine itself is unreachable; anything
/// that produced an HTTP response is an engine-side error.
fn classify_transport_error(err: reqwest::Error) -> EngineError {
    if err.is_status() {
        EngineError::Engine(err.to_string())
    } else {
        EngineError::Unreachable(err.to_string())
    }
}

/// Pull a required string field out of an engine response.
fn required_str<'a>(body: &'a Value, field: &str, path: &str) -> Result<&'a str, EngineError> {
    body.get(field).and_then(Value::as_str).ok_or_else(|| {
        EngineError::Engine(format!("{path} response missing `{field}` field"))
    })
}

/// The engine reports job progress as a stringified integer percentage.
fn parse_percent(raw: &str) -> Result<u8, EngineError> {
    raw.parse::<u8>()
        .map(|pct| pct.min(100))
        .map_err(|_| EngineError::Engine(format!("unparseable progress value `{raw}`")))
}

#[async_trait]
impl ScanEngine for ZapClient {
    async fn engine_version(&self) -> Result<String, EngineError> {
        let body = self.call("JSON/core/view/version/", &[]).await?;
        Ok(required_str(&body, "version", "core/view/version")?.to_string())
    }

    async fn verify_connection(
        &self,
        target_url: &str,
    ) -> Result<ConnectionStatus, EngineError> {
        let engine_version = self.engine_version().await?;

        // Ask the engine to fetch the target once. An engine-side error means
        // the target could not be reached; a transport error still propagates.
        let target_reachable = match self
            .call("JSON/core/action/accessUrl/", &[("url", target_url)])
            .await
        {
            Ok(_) => true,
            Err(EngineError::Engine(_)) => false,
            Err(e @ EngineError::Unreachable(_)) => return Err(e),
        };

        Ok(ConnectionStatus {
            engine_version,
            target_reachable,
        })
    }

    async fn start_spider(&self, target_url: &str) -> Result<JobHandle, EngineError> {
        let body = self
            .call("JSON/spider/action/scan/", &[("url", target_url)])
            .await?;
        let id = required_str(&body, "scan", "spider/action/scan")?;
        Ok(JobHandle::Spider(id.to_string()))
    }

    async fn start_ajax_spider(&self, target_url: &str) -> Result<JobHandle, EngineError> {
        self.call("JSON/ajaxSpider/action/scan/", &[("url", target_url)])
            .await?;
        // The ajax spider runs as a singleton; polling is id-less.
        Ok(JobHandle::AjaxSpider)
    }

    async fn start_active_scan(&self, target_url: &str) -> Result<JobHandle, EngineError> {
        let body = self
            .call(
                "JSON/ascan/action/scan/",
                &[("url", target_url), ("recurse", "true")],
            )
            .await?;
        let id = required_str(&body, "scan", "ascan/action/scan")?;
        Ok(JobHandle::ActiveScan(id.to_string()))
    }

    async fn poll_status(&self, job: &JobHandle) -> Result<u8, EngineError> {
        match job {
            JobHandle::Spider(id) => {
                let body = self
                    .call("JSON/spider/view/status/", &[("scanId", id)])
                    .await?;
                parse_percent(required_str(&body, "status", "spider/view/status")?)
            }
            JobHandle::AjaxSpider => {
                let body = self.call("JSON/ajaxSpider/view/status/", &[]).await?;
                let state = required_str(&body, "status", "ajaxSpider/view/status")?;
                // Reported as running/stopped rather than a percentage.
                Ok(if state.eq_ignore_ascii_case("stopped") {
                    100
                } else {
                    0
                })
            }
            JobHandle::ActiveScan(id) => {
                let body = self
                    .call("JSON/ascan/view/status/", &[("scanId", id)])
                    .await?;
                parse_percent(required_str(&body, "status", "ascan/view/status")?)
            }
        }
    }

    async fn fetch_alerts(&self, target_url: &str) -> Result<Vec<RawAlert>, EngineError> {
        let body = self
            .call("JSON/core/view/alerts/", &[("baseurl", target_url)])
            .await?;
        let alerts = body.get("alerts").cloned().ok_or_else(|| {
            EngineError::Engine("core/view/alerts response missing `alerts` field".to_string())
        })?;
        serde_json::from_value(alerts)
            .map_err(|e| EngineError::Engine(format!("unparseable alerts report: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_percent_plain_value() {
        assert_eq!(parse_percent("45").unwrap(), 45);
        assert_eq!(parse_percent("100").unwrap(), 100);
    }

    #[test]
    fn parse_percent_clamps_overshoot() {
        // Some engine versions briefly report >100 on finishing jobs.
        assert_eq!(parse_percent("120").unwrap(), 100);
    }

    #[test]
    fn parse_percent_rejects_garbage() {
        assert!(parse_percent("running").is_err());
        assert!(parse_percent("").is_err());
    }

    #[test]
    fn required_str_missing_field() {
        let body = serde_json::json!({ "other": "x" });
        let err = required_str(&body, "scan", "spider/action/scan").unwrap_err();
        assert!(err.to_string().contains("missing `scan`"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ZapClient::new("http://localhost:8080/", None).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
