//! Periodic discovery driven by the dead-instance filter.
//!
//! # Responsibilities
//! - Tick every base poll interval and dispatch a probe per instance
//! - Skip dead instances still inside their backoff window
//! - Route recheck-due dead instances to the dedicated pool when configured
//! - Report probe results back to the filter

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::config::DiscoveryConfig;
use crate::discovery::probe::Prober;
use crate::filter::{DeadInstanceFilter, Registration};
use crate::instance::InstanceKey;
use crate::observability::metrics;

/// Floor for the tick period; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What happened to one instance during discovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiscoveryOutcome {
    /// Known dead and inside its backoff window; not probed.
    Throttled,
    /// Probe succeeded. `recovered` is set when the instance was tracked as dead.
    Reachable { recovered: bool },
    /// Probe failed and the instance was registered as dead.
    Unreachable(Registration),
    /// Probe failed but the instance is no longer configured, so it is not
    /// tracked.
    Unconfigured,
}

/// Which pool, if any, an instance goes to this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Throttled,
    Regular,
    Recheck,
}

/// Polls configured instances, throttling dead ones through the filter.
pub struct DiscoveryScheduler<P> {
    filter: Arc<DeadInstanceFilter>,
    prober: Arc<P>,
    config: ArcSwap<DiscoveryConfig>,
    poll_interval: Duration,
    regular_pool: Arc<Semaphore>,
    dead_pool: Option<Arc<Semaphore>>,
    in_flight: Mutex<HashSet<InstanceKey>>,
}

impl<P: Prober> DiscoveryScheduler<P> {
    /// Create a scheduler.
    ///
    /// The poll interval and pool sizes are taken from `config` once and do
    /// not change on reload.
    pub fn new(config: DiscoveryConfig, filter: Arc<DeadInstanceFilter>, prober: P) -> Self {
        let regular_pool = Arc::new(Semaphore::new(config.polling.max_concurrency));
        let dead_pool = match config.dead_instances.discovery_max_concurrency {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        Self {
            filter,
            prober: Arc::new(prober),
            poll_interval: config.polling.poll_interval(),
            config: ArcSwap::from_pointee(config),
            regular_pool,
            dead_pool,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn filter(&self) -> &Arc<DeadInstanceFilter> {
        &self.filter
    }

    /// Configuration currently in effect.
    pub fn config(&self) -> Arc<DiscoveryConfig> {
        self.config.load_full()
    }

    /// Whether dead instances are probed by their own pool.
    pub fn has_dedicated_dead_pool(&self) -> bool {
        self.dead_pool.is_some()
    }

    /// Number of instances with a probe queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Swap in a reloaded configuration.
    ///
    /// Backoff tunables go to the filter and the instance list is replaced.
    /// Instances no longer configured are dropped from the filter.
    pub fn apply_config(&self, new_config: DiscoveryConfig) {
        let old = self.config.load_full();

        if new_config.polling.instance_poll_secs != old.polling.instance_poll_secs
            || new_config.polling.max_concurrency != old.polling.max_concurrency
            || new_config.dead_instances.discovery_max_concurrency
                != old.dead_instances.discovery_max_concurrency
        {
            tracing::warn!(
                "Poll interval and pool size changes take effect after a restart"
            );
        }

        let settings = new_config.backoff_settings();
        tracing::info!(
            instances = new_config.polling.instances.len(),
            backoff = settings.backoff_enabled(),
            multiply_factor = settings.multiply_factor,
            max_delay_secs = settings.max_delay.as_secs(),
            "Discovery configuration applied"
        );
        self.filter.update_settings(settings);

        // Store first; probe_and_record re-checks the list after registering.
        let new_config = Arc::new(new_config);
        self.config.store(Arc::clone(&new_config));

        let kept: HashSet<&InstanceKey> = new_config.polling.instances.iter().collect();
        for key in old.polling.instances.iter().filter(|k| !kept.contains(k)) {
            if self.filter.unregister_instance(key).is_some() {
                tracing::info!(instance = %key, "Dropped dead instance removed from configuration");
            }
        }
    }

    fn is_configured(&self, key: &InstanceKey) -> bool {
        self.config.load().polling.instances.contains(key)
    }

    /// Discover one instance: consult the filter, probe if allowed, and
    /// record the result.
    pub async fn discover_instance(&self, key: &InstanceKey) -> DiscoveryOutcome {
        match self.route(key) {
            Route::Throttled => DiscoveryOutcome::Throttled,
            Route::Regular | Route::Recheck => self.probe_and_record(key).await,
        }
    }

    fn route(&self, key: &InstanceKey) -> Route {
        match self.filter.instance_recheck_needed(key) {
            (false, _) => Route::Regular,
            (true, false) => {
                metrics::record_throttled();
                Route::Throttled
            }
            (true, true) => {
                metrics::record_dead_recheck();
                Route::Recheck
            }
        }
    }

    async fn probe_and_record(&self, key: &InstanceKey) -> DiscoveryOutcome {
        match self.prober.probe(key).await {
            Ok(()) => {
                metrics::record_probe(true);
                let previous = self.filter.unregister_instance(key);
                if let Some(record) = previous {
                    tracing::info!(
                        instance = %key,
                        failed_probes = record.try_count,
                        "Instance reachable again"
                    );
                }
                DiscoveryOutcome::Reachable {
                    recovered: previous.is_some(),
                }
            }
            Err(e) => {
                metrics::record_probe(false);
                let registration = self.filter.register_instance(key);
                if !self.is_configured(key) {
                    // Removed by a reload while the probe was running.
                    self.filter.unregister_instance(key);
                    tracing::debug!(instance = %key, "Ignoring failure of unconfigured instance");
                    return DiscoveryOutcome::Unconfigured;
                }
                if registration.newly_dead {
                    tracing::warn!(instance = %key, error = %e, "Instance unreachable");
                } else {
                    tracing::debug!(
                        instance = %key,
                        error = %e,
                        try_count = registration.record.try_count,
                        next_check_secs = registration.delay.as_secs_f64(),
                        "Instance still unreachable"
                    );
                }
                DiscoveryOutcome::Unreachable(registration)
            }
        }
    }

    /// Run the discovery loop until `shutdown` fires.
    ///
    /// Probes still queued or running at shutdown are aborted.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.poll_interval.as_secs_f64(),
            dedicated_dead_pool = self.has_dedicated_dead_pool(),
            backoff = self.filter.settings().backoff_enabled(),
            "Discovery scheduler starting"
        );

        let mut ticker = time::interval(self.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.dispatch(&mut tasks);
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Discovery task panicked");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Discovery scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        tasks.shutdown().await;
    }

    fn dispatch(self: &Arc<Self>, tasks: &mut JoinSet<()>) {
        let config = self.config.load();
        let mut dispatched = 0usize;

        for key in &config.polling.instances {
            if self.in_flight.lock().contains(key) {
                tracing::debug!(instance = %key, "Previous probe still in flight");
                continue;
            }

            let pool = match self.route(key) {
                Route::Throttled => continue,
                Route::Recheck => self.dead_pool.as_ref().unwrap_or(&self.regular_pool),
                Route::Regular => &self.regular_pool,
            };

            let Some(guard) = InFlightGuard::acquire(self, key) else {
                continue;
            };

            let pool = Arc::clone(pool);
            let scheduler = Arc::clone(self);
            tasks.spawn(async move {
                let Ok(_permit) = pool.acquire_owned().await else {
                    return;
                };
                scheduler.probe_and_record(&guard.key).await;
            });
            dispatched += 1;
        }

        tracing::debug!(
            instances = config.polling.instances.len(),
            dispatched,
            dead = self.filter.len(),
            "Discovery tick"
        );
    }
}

/// Marks an instance as in flight until dropped, including when the probe
/// task is aborted.
struct InFlightGuard<P: Prober> {
    scheduler: Arc<DiscoveryScheduler<P>>,
    key: InstanceKey,
}

impl<P: Prober> InFlightGuard<P> {
    fn acquire(scheduler: &Arc<DiscoveryScheduler<P>>, key: &InstanceKey) -> Option<Self> {
        if !scheduler.in_flight.lock().insert(key.clone()) {
            return None;
        }
        Some(Self {
            scheduler: Arc::clone(scheduler),
            key: key.clone(),
        })
    }
}

impl<P: Prober> Drop for InFlightGuard<P> {
    fn drop(&mut self) {
        self.scheduler.in_flight.lock().remove(&self.key);
    }
}
