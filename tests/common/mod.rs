//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use instance_discovery::config::DiscoveryConfig;
use instance_discovery::discovery::{ProbeError, Prober};
use instance_discovery::filter::{BackoffSettings, DeadInstanceFilter, ManualClock};
use instance_discovery::observability::DeadInstanceMetrics;
use instance_discovery::InstanceKey;

/// In-memory stand-in for the dead-instance gauge.
#[derive(Default)]
pub struct CountingMetrics {
    live: AtomicI64,
}

impl CountingMetrics {
    pub fn live(&self) -> i64 {
        self.live.load(Ordering::SeqCst)
    }
}

impl DeadInstanceMetrics for CountingMetrics {
    fn instance_added(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
    }

    fn instance_removed(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// How a scripted instance answers probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Up,
    Down,
    /// Never answers; the probe stays pending.
    Hang,
    /// Fails after the given delay.
    SlowDown(Duration),
}

/// Prober driven by a per-instance script, counting every probe.
#[derive(Default)]
pub struct ScriptedProber {
    behaviour: Mutex<HashMap<InstanceKey, Behaviour>>,
    probes: Mutex<HashMap<InstanceKey, usize>>,
}

impl ScriptedProber {
    pub fn set(&self, key: &InstanceKey, behaviour: Behaviour) {
        self.behaviour.lock().unwrap().insert(key.clone(), behaviour);
    }

    pub fn probes(&self, key: &InstanceKey) -> usize {
        self.probes.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

/// Shared handle so tests can keep scripting after handing it to a scheduler.
#[derive(Clone, Default)]
pub struct SharedProber(pub Arc<ScriptedProber>);

impl Prober for SharedProber {
    async fn probe(&self, key: &InstanceKey) -> Result<(), ProbeError> {
        *self.0.probes.lock().unwrap().entry(key.clone()).or_default() += 1;
        let behaviour = self
            .0
            .behaviour
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(Behaviour::Down);

        match behaviour {
            Behaviour::Up => Ok(()),
            Behaviour::Down => Err(ProbeError::Timeout(Duration::from_secs(1))),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::SlowDown(delay) => {
                tokio::time::sleep(delay).await;
                Err(ProbeError::Timeout(delay))
            }
        }
    }
}

pub fn backoff(base_secs: u64, factor: f64, max_secs: u64) -> BackoffSettings {
    BackoffSettings {
        base_poll_interval: Duration::from_secs(base_secs),
        multiply_factor: factor,
        max_delay: Duration::from_secs(max_secs),
        verbose_logging: false,
    }
}

/// Filter on a manual clock with a counting gauge.
pub fn manual_filter(
    settings: BackoffSettings,
) -> (Arc<DeadInstanceFilter>, Arc<CountingMetrics>, Arc<ManualClock>) {
    let metrics = Arc::new(CountingMetrics::default());
    let clock = Arc::new(ManualClock::new());
    let filter = Arc::new(DeadInstanceFilter::with_clock(
        settings,
        metrics.clone(),
        clock.clone(),
    ));
    (filter, metrics, clock)
}

pub fn discovery_config(instances: &[InstanceKey]) -> DiscoveryConfig {
    let mut config = DiscoveryConfig::default();
    config.polling.instance_poll_secs = 5;
    config.polling.instances = instances.to_vec();
    config.observability.metrics_enabled = false;
    config
}
