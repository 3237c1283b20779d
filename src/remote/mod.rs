mod http;

use async_trait::async_trait;
use std::collections::BTreeMap;

pub use http::HttpMetricSource;

/// One fetch attempt against the remote metrics service.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The remote explicitly asked us to slow down. Cooperative throttling,
    /// not a fault; carries the server-suggested wait when one was given.
    #[error("rate limited by remote{}", retry_after_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    /// Network-level failure: unreachable host, timeout, non-success status.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Anything unexpected, including a response body that fails to decode.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn retry_after_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

/// Remote collaborator the polling agent fetches from. One call per cycle;
/// any connection is scoped to the single attempt.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch_metrics(
        &self,
        server_key: &str,
        hardware_key: &str,
    ) -> Result<BTreeMap<String, String>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_display() {
        let with_hint = FetchError::RateLimited {
            retry_after: Some(45),
        };
        assert_eq!(
            with_hint.to_string(),
            "rate limited by remote (retry after 45s)"
        );

        let without = FetchError::RateLimited { retry_after: None };
        assert_eq!(without.to_string(), "rate limited by remote");
    }
}
