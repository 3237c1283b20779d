use crate::core::models::{validate_batch, CriterionRecord, InvalidCriterion};
use crate::core::sink::CriteriaSink;
use std::sync::Arc;

/// Why an inbound batch was rejected. Rejection is always whole-batch: no
/// partial forwarding, regardless of how many items were fine.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid request body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("item {index}: {reason}")]
    Invalid {
        index: usize,
        reason: InvalidCriterion,
    },
}

/// Push interface: decodes a JSON batch of criteria and forwards it, in
/// order, to the same sink the polling agent feeds.
pub struct IngestEndpoint {
    sink: Arc<dyn CriteriaSink>,
}

impl IngestEndpoint {
    pub fn new(sink: Arc<dyn CriteriaSink>) -> Self {
        Self { sink }
    }

    /// Returns the number of accepted records so callers can tell an accepted
    /// batch from a rejected one.
    pub fn submit(&self, body: &[u8]) -> Result<usize, IngestError> {
        let records: Vec<CriterionRecord> = serde_json::from_slice(body)?;

        validate_batch(&records)
            .map_err(|(index, reason)| IngestError::Invalid { index, reason })?;

        let accepted = records.len();
        tracing::debug!(accepted, "Forwarding submitted criteria batch");
        self.sink.on_criteria_resolved(records);
        Ok(accepted)
    }
}
