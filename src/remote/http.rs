use crate::core::settings::RemoteSettings;
use crate::remote::{FetchError, MetricSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const METHOD: &str = "getMetrics";

/// Fetches the remote service's metric map over HTTP. The client timeout
/// bounds every attempt, which is what bounds `stop()` latency for the agent.
pub struct HttpMetricSource {
    client: reqwest::Client,
    url: String,
}

impl HttpMetricSource {
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.fetch_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: settings.url.clone(),
        })
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn fetch_metrics(
        &self,
        server_key: &str,
        hardware_key: &str,
    ) -> Result<BTreeMap<String, String>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("method", METHOD),
                ("serverKey", server_key),
                ("hardwareKey", hardware_key),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                retry_after: retry_after_secs(response.headers()),
            });
        }

        if !response.status().is_success() {
            return Err(FetchError::Transport(format!(
                "remote returned {}",
                response.status()
            )));
        }

        let body: serde_json::Map<String, Value> = response
            .json()
            .await
            .context("Failed to decode metrics response")?;

        Ok(body
            .into_iter()
            .map(|(metric, value)| (metric, value_to_string(&value)))
            .collect())
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Remote values arrive as arbitrary JSON scalars; criteria carry strings.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
