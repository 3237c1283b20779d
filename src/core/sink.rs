use crate::core::models::CriterionRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Consumer seam shared by the ingest endpoint and the polling agent. Each
/// batch is delivered atomically; implementations must be safe to call from
/// multiple concurrent producers and must not block indefinitely.
pub trait CriteriaSink: Send + Sync {
    fn on_criteria_resolved(&self, records: Vec<CriterionRecord>);
}

/// Fire-and-forget counter for operational visibility into remote transport
/// failures. Never blocks the caller.
pub trait FaultCounter: Send + Sync {
    fn record_transport_failure(&self);
}

/// Sink that hands batches to an unbounded channel; the daemon's consumer task
/// sits on the other end.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Vec<CriterionRecord>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Vec<CriterionRecord>>) -> Self {
        Self { tx }
    }
}

impl CriteriaSink for ChannelSink {
    fn on_criteria_resolved(&self, records: Vec<CriterionRecord>) {
        if self.tx.send(records).is_err() {
            tracing::warn!("downstream consumer is gone, dropping criteria batch");
        }
    }
}

#[derive(Default)]
pub struct TransportFaults {
    count: AtomicU64,
}

impl TransportFaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl FaultCounter for TransportFaults {
    fn record_transport_failure(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_counter_increments() {
        let faults = TransportFaults::new();
        assert_eq!(faults.count(), 0);
        faults.record_transport_failure();
        faults.record_transport_failure();
        assert_eq!(faults.count(), 2);
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_batches_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);

        sink.on_criteria_resolved(vec![CriterionRecord::new("temperature", "21", 60)]);
        sink.on_criteria_resolved(vec![CriterionRecord::new("humidity", "40", 60)]);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first[0].metric, "temperature");
        assert_eq!(second[0].metric, "humidity");
    }

    #[tokio::test]
    async fn test_channel_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelSink::new(tx);
        // Must not panic or block.
        sink.on_criteria_resolved(vec![CriterionRecord::new("temperature", "21", 60)]);
    }
}
