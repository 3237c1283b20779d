pub mod agent;
mod server;

use crate::core::settings::{Settings, SettingsWatcher};
use crate::core::sink::{ChannelSink, CriteriaSink, TransportFaults};
use crate::daemon::agent::{AgentConfig, PollingAgent};
use crate::ingest::IngestEndpoint;
use crate::remote::{HttpMetricSource, MetricSource};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run() -> Result<()> {
    let settings = Settings::load()?;
    settings.validate()?;

    tracing::info!("Starting criteria-relay daemon");

    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel();
    let sink: Arc<dyn CriteriaSink> = Arc::new(ChannelSink::new(batch_tx));
    let faults = Arc::new(TransportFaults::new());
    let source: Arc<dyn MetricSource> = Arc::new(HttpMetricSource::new(&settings.remote)?);

    let agent = Arc::new(PollingAgent::spawn(
        AgentConfig::from_settings(&settings),
        source,
        Arc::clone(&sink),
        Arc::clone(&faults) as _,
    ));

    // Downstream evaluator seam: resolved batches arrive here, each atomic and
    // in the order its producer forwarded it.
    tokio::spawn(async move {
        while let Some(batch) = batch_rx.recv().await {
            tracing::info!(count = batch.len(), "Criteria batch resolved");
            for record in &batch {
                tracing::debug!(
                    metric = %record.metric,
                    value = %record.value,
                    ttl = record.ttl,
                    "criterion"
                );
            }
        }
    });

    // Config edits apply at runtime; polling.enabled is the live toggle.
    if let Some(path) = Settings::config_path() {
        let (watcher, mut settings_rx) = SettingsWatcher::start(path)?;
        let agent_for_settings = Arc::clone(&agent);
        tokio::spawn(async move {
            let _watcher = watcher;
            while let Some(new_settings) = settings_rx.recv().await {
                agent_for_settings
                    .enable(new_settings.polling.enabled)
                    .await;
            }
        });
    }

    let endpoint = Arc::new(IngestEndpoint::new(sink));
    let addr: SocketAddr = settings
        .ingest
        .bind
        .parse()
        .with_context(|| format!("Invalid ingest bind address: {}", settings.ingest.bind))?;
    let api = server::routes(endpoint, Arc::clone(&agent), faults);

    let (bound, serving) = warp::serve(api).bind_with_graceful_shutdown(addr, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
    });
    tracing::info!(addr = %bound, "Ingest endpoint listening");

    serving.await;

    agent.stop().await;
    tracing::info!("Daemon stopped");
    Ok(())
}
