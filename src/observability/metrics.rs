//! Metrics collection and exposition.
//!
//! # Metrics
//! - `discoveries_dead_instances` (gauge): instances currently tracked as dead
//! - `discoveries_probes_total` (counter): probes by result (`ok`, `failed`)
//! - `discoveries_throttled_total` (counter): discoveries skipped by the dead-instance filter
//! - `discoveries_dead_rechecks_total` (counter): probes of dead instances whose window elapsed

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const DEAD_INSTANCES: &str = "discoveries_dead_instances";
pub const PROBES_TOTAL: &str = "discoveries_probes_total";
pub const THROTTLED_TOTAL: &str = "discoveries_throttled_total";
pub const DEAD_RECHECKS_TOTAL: &str = "discoveries_dead_rechecks_total";

/// Sink for the live count of tracked dead instances.
pub trait DeadInstanceMetrics: Send + Sync {
    /// An instance entered the dead set.
    fn instance_added(&self);

    /// An instance left the dead set.
    fn instance_removed(&self);
}

/// Reports the dead-instance count through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusDeadInstances;

impl DeadInstanceMetrics for PrometheusDeadInstances {
    fn instance_added(&self) {
        gauge!(DEAD_INSTANCES).increment(1.0);
    }

    fn instance_removed(&self) {
        gauge!(DEAD_INSTANCES).decrement(1.0);
    }
}

/// Install the Prometheus recorder and its HTTP scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

fn describe_metrics() {
    describe_gauge!(DEAD_INSTANCES, "Instances currently tracked as dead");
    describe_counter!(PROBES_TOTAL, "Instance probes by result");
    describe_counter!(THROTTLED_TOTAL, "Discoveries skipped by the dead-instance filter");
    describe_counter!(DEAD_RECHECKS_TOTAL, "Probes of dead instances whose backoff elapsed");
}

/// Record the outcome of one probe.
pub fn record_probe(success: bool) {
    let result = if success { "ok" } else { "failed" };
    counter!(PROBES_TOTAL, "result" => result).increment(1);
}

/// Record a discovery skipped because the instance is inside its backoff window.
pub fn record_throttled() {
    counter!(THROTTLED_TOTAL).increment(1);
}

/// Record a probe of a dead instance whose backoff window elapsed.
pub fn record_dead_recheck() {
    counter!(DEAD_RECHECKS_TOTAL).increment(1);
}
