//! Startup orchestration.
//!
//! # Responsibilities
//! - Wire the filter, prober and scheduler from a validated configuration
//! - Run the discovery loop, applying configuration reloads, until a stop
//!   signal arrives
//!
//! # Design Decisions
//! - Fail fast: configuration errors are fatal before anything starts
//! - The filter is built here and passed into the scheduler; nothing global

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::DiscoveryConfig;
use crate::discovery::{DiscoveryScheduler, Prober, TcpProber};
use crate::filter::DeadInstanceFilter;
use crate::lifecycle::DiscoveryTask;
use crate::observability::PrometheusDeadInstances;

/// Build the production scheduler: TCP probes, Prometheus-backed gauge.
pub fn build_scheduler(config: DiscoveryConfig) -> Arc<DiscoveryScheduler<TcpProber>> {
    let filter = Arc::new(DeadInstanceFilter::new(
        config.backoff_settings(),
        Arc::new(PrometheusDeadInstances),
    ));
    let prober = TcpProber::new(config.polling.probe_timeout());
    Arc::new(DiscoveryScheduler::new(config, filter, prober))
}

/// Drive `scheduler` until `stop` resolves.
///
/// Configuration updates received on `config_updates` are applied as they
/// arrive. The scheduler runs as a [`DiscoveryTask`] and is stopped and
/// awaited before returning.
pub async fn run_until<P, F>(
    scheduler: Arc<DiscoveryScheduler<P>>,
    mut config_updates: mpsc::UnboundedReceiver<DiscoveryConfig>,
    stop: F,
) where
    P: Prober,
    F: Future<Output = ()>,
{
    let discovery = DiscoveryTask::spawn(Arc::clone(&scheduler));

    tokio::pin!(stop);
    loop {
        tokio::select! {
            Some(new_config) = config_updates.recv() => {
                scheduler.apply_config(new_config);
            }
            _ = &mut stop => break,
        }
    }

    tracing::info!(
        dead_instances = scheduler.filter().len(),
        "Stopping discovery"
    );
    if let Err(e) = discovery.stop().await {
        tracing::error!(error = %e, "Discovery task failed");
    }
}
