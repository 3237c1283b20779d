use crate::core::backoff;
use crate::core::models::{validate_batch, CriterionRecord};
use crate::core::settings::Settings;
use crate::core::sink::{CriteriaSink, FaultCounter};
use crate::remote::{FetchError, MetricSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub poll_interval: Duration,
    pub rate_limit_wait: Duration,
    pub default_ttl: u64,
    pub server_key: String,
    pub hardware_key: String,
    pub start_enabled: bool,
}

impl AgentConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.polling.interval(),
            rate_limit_wait: settings.polling.rate_limit_wait(),
            default_ttl: settings.polling.default_ttl(),
            server_key: settings.remote.server_key.clone(),
            hardware_key: settings.remote.hardware_key.clone(),
            start_enabled: settings.polling.enabled,
        }
    }
}

#[derive(Debug)]
struct AgentState {
    enabled: bool,
    stopping: bool,
}

/// Long-lived background poller. Owns one spawned task that fetches metrics
/// from the remote source each cycle and hands the resolved batch to the sink.
///
/// The state mutex serializes the fetch-and-check against `enable`/`stop`, so
/// a cycle never observes a half-applied toggle and fetches never overlap.
/// The wake channel is the interruptible-sleep primitive: the loop sleeps
/// until woken or until the cycle's wait elapses, whichever comes first.
pub struct PollingAgent {
    state: Arc<Mutex<AgentState>>,
    wake_tx: watch::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollingAgent {
    pub fn spawn(
        config: AgentConfig,
        source: Arc<dyn MetricSource>,
        sink: Arc<dyn CriteriaSink>,
        faults: Arc<dyn FaultCounter>,
    ) -> Self {
        let state = Arc::new(Mutex::new(AgentState {
            enabled: config.start_enabled,
            stopping: false,
        }));
        let (wake_tx, wake_rx) = watch::channel(());

        let task = tokio::spawn(run_loop(
            Arc::clone(&state),
            wake_rx,
            config,
            source,
            sink,
            faults,
        ));

        Self {
            state,
            wake_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Turning polling on from off wakes the loop immediately; turning it off
    /// takes effect at the next cycle check. Same-value calls do not wake.
    pub async fn enable(&self, on: bool) {
        let was = {
            let mut state = self.state.lock().await;
            let was = state.enabled;
            state.enabled = on;
            was
        };

        if !was && on {
            tracing::info!("Polling enabled, waking loop");
            self.wake();
        } else if was && !on {
            tracing::info!("Polling disabled, takes effect next cycle");
        }
    }

    /// Unconditionally interrupts the current sleep.
    pub fn wake(&self) {
        let _ = self.wake_tx.send(());
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.enabled
    }

    /// Signals shutdown and waits for the loop to exit. Does not abort an
    /// in-flight fetch; the source's own timeout bounds how long that takes.
    /// Idempotent.
    pub async fn stop(&self) {
        self.state.lock().await.stopping = true;
        self.wake();

        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Polling task ended abnormally");
            }
        }
    }
}

async fn run_loop(
    state: Arc<Mutex<AgentState>>,
    mut wake_rx: watch::Receiver<()>,
    config: AgentConfig,
    source: Arc<dyn MetricSource>,
    sink: Arc<dyn CriteriaSink>,
    faults: Arc<dyn FaultCounter>,
) {
    tracing::info!(
        interval_secs = config.poll_interval.as_secs(),
        "Polling loop started"
    );

    loop {
        // Consume any wake that arrived before this cycle began.
        wake_rx.borrow_and_update();

        let mut wait_override = None;
        {
            let state = state.lock().await;
            if state.stopping {
                break;
            }
            if state.enabled {
                wait_override =
                    poll_once(&config, source.as_ref(), sink.as_ref(), faults.as_ref()).await;
            }
        }

        let wait = backoff::next_wait(wait_override, config.poll_interval);
        tokio::select! {
            changed = wake_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(wait) => {}
        }
    }

    tracing::info!("Polling loop stopped");
}

/// One fetch attempt. Every failure is classified and absorbed here; nothing
/// propagates out of the cycle. Returns the wait override for this iteration,
/// set only on a rate-limit response.
async fn poll_once(
    config: &AgentConfig,
    source: &dyn MetricSource,
    sink: &dyn CriteriaSink,
    faults: &dyn FaultCounter,
) -> Option<Duration> {
    match source
        .fetch_metrics(&config.server_key, &config.hardware_key)
        .await
    {
        Ok(metrics) => {
            let records: Vec<CriterionRecord> = metrics
                .into_iter()
                .map(|(metric, value)| CriterionRecord::new(metric, value, config.default_ttl))
                .collect();

            if let Err((index, reason)) = validate_batch(&records) {
                tracing::error!(index, %reason, "Dropping poll batch with malformed record");
                return None;
            }

            tracing::debug!(count = records.len(), "Resolved criteria from remote");
            sink.on_criteria_resolved(records);
            None
        }
        Err(FetchError::RateLimited { retry_after }) => {
            let wait = backoff::rate_limit_wait(retry_after, config.rate_limit_wait);
            tracing::info!(wait_secs = wait.as_secs(), "Rate limited, deferring next poll");
            Some(wait)
        }
        Err(FetchError::Transport(reason)) => {
            faults.record_transport_failure();
            tracing::warn!(error = %reason, "Transport failure fetching metrics");
            None
        }
        Err(FetchError::Other(e)) => {
            tracing::error!(error = %e, "Unexpected failure during poll cycle");
            None
        }
    }
}
