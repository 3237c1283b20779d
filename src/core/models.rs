use serde::{Deserialize, Serialize};

/// A single time-bounded metric observation, handed to the downstream sink
/// exactly once at the moment it is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionRecord {
    pub metric: String,
    pub value: String,
    /// Seconds the value remains valid from the moment of resolution.
    pub ttl: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidCriterion {
    #[error("metric name is empty")]
    EmptyMetric,
}

impl CriterionRecord {
    pub fn new(metric: impl Into<String>, value: impl Into<String>, ttl: u64) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
            ttl,
        }
    }

    /// A record is well-formed when its metric name is non-empty after trimming.
    /// `value` may be empty; `ttl` is non-negative by construction.
    pub fn validate(&self) -> Result<(), InvalidCriterion> {
        if self.metric.trim().is_empty() {
            return Err(InvalidCriterion::EmptyMetric);
        }
        Ok(())
    }
}

/// Batch validation is all-or-nothing: one malformed record rejects the lot.
pub fn validate_batch(records: &[CriterionRecord]) -> Result<(), (usize, InvalidCriterion)> {
    for (index, record) in records.iter().enumerate() {
        record.validate().map_err(|e| (index, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record() {
        let record = CriterionRecord::new("temperature", "21.4", 300);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_empty_value_is_allowed() {
        let record = CriterionRecord::new("wind_direction", "", 300);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_blank_metric_rejected() {
        let record = CriterionRecord::new("   ", "5", 300);
        assert_eq!(record.validate(), Err(InvalidCriterion::EmptyMetric));
    }

    #[test]
    fn test_batch_rejects_on_any_bad_record() {
        let batch = vec![
            CriterionRecord::new("temperature", "21.4", 300),
            CriterionRecord::new("", "5", 300),
            CriterionRecord::new("humidity", "40", 300),
        ];
        assert_eq!(
            validate_batch(&batch),
            Err((1, InvalidCriterion::EmptyMetric))
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let record = CriterionRecord::new("humidity", "40", 60);
        let json = serde_json::to_string(&record).unwrap();
        let back: CriterionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn test_negative_ttl_fails_decode() {
        let err = serde_json::from_str::<CriterionRecord>(
            r#"{"metric": "temperature", "value": "21", "ttl": -1}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_missing_value_fails_decode() {
        let err =
            serde_json::from_str::<CriterionRecord>(r#"{"metric": "temperature", "ttl": 60}"#);
        assert!(err.is_err());
    }
}
