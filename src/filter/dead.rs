//! Registry of instances whose last probe failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::filter::clock::{Clock, SystemClock};
use crate::filter::settings::BackoffSettings;
use crate::instance::InstanceKey;
use crate::observability::metrics::DeadInstanceMetrics;

/// Fallback horizon when `now + delay` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Backoff state of one dead instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadInstanceRecord {
    /// Current multiplier applied to the base poll interval.
    pub delay_factor: f64,
    /// Earliest moment a recheck is allowed.
    pub next_check_time: Instant,
    /// Failed probes registered since the instance was last seen alive.
    pub try_count: u32,
}

/// Result of [`DeadInstanceFilter::register_instance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Registration {
    /// The record as stored.
    pub record: DeadInstanceRecord,
    /// Wait applied before the next recheck, after capping.
    pub delay: Duration,
    /// `true` when the instance was not tracked before this call.
    pub newly_dead: bool,
}

/// Throttles probing of unreachable instances with exponential backoff.
///
/// The filter never probes anything itself. Probe workers ask it whether a
/// known-dead instance is due ([`instance_recheck_needed`]) and report the
/// outcome back ([`register_instance`] on failure, [`unregister_instance`]
/// on success). All methods take `&self`; share the filter through an `Arc`.
///
/// Two workers registering the same instance at once serialize on the write
/// lock, so the try count may run one ahead of the number of distinct probe
/// rounds. Accounting is best-effort.
///
/// [`instance_recheck_needed`]: Self::instance_recheck_needed
/// [`register_instance`]: Self::register_instance
/// [`unregister_instance`]: Self::unregister_instance
pub struct DeadInstanceFilter {
    dead: RwLock<HashMap<InstanceKey, DeadInstanceRecord>>,
    settings: ArcSwap<BackoffSettings>,
    metrics: Arc<dyn DeadInstanceMetrics>,
    clock: Arc<dyn Clock>,
}

impl DeadInstanceFilter {
    /// Create a filter driven by the system clock.
    pub fn new(settings: BackoffSettings, metrics: Arc<dyn DeadInstanceMetrics>) -> Self {
        Self::with_clock(settings, metrics, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: BackoffSettings,
        metrics: Arc<dyn DeadInstanceMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            dead: RwLock::new(HashMap::new()),
            settings: ArcSwap::from_pointee(settings),
            metrics,
            clock,
        }
    }

    /// Current backoff settings.
    pub fn settings(&self) -> Arc<BackoffSettings> {
        self.settings.load_full()
    }

    /// Swap in new backoff settings.
    ///
    /// Existing records keep their factor and next check time; the new values
    /// apply from the next registration onwards.
    pub fn update_settings(&self, settings: BackoffSettings) {
        self.settings.store(Arc::new(settings));
    }

    /// Record a failed probe of `key` and push its next recheck out.
    ///
    /// The delay factor is multiplied by the configured factor on every call.
    /// Once `factor × base_poll_interval` would exceed `max_delay`, the delay
    /// is pinned to `max_delay` and the factor stops growing.
    pub fn register_instance(&self, key: &InstanceKey) -> Registration {
        let settings = self.settings.load();

        let mut dead = self.dead.write();
        let previous = dead.get(key).copied();
        if previous.is_none() {
            self.metrics.instance_added();
        }

        let current_factor = previous.map_or(1.0, |r| r.delay_factor);
        let previous_tries = previous.map_or(0, |r| r.try_count);

        let mut factor = settings.multiply_factor * current_factor;
        let mut delay = settings.scaled_delay(factor);
        if delay > settings.max_delay {
            delay = settings.max_delay;
            factor = current_factor;
        }

        let now = self.clock.now();
        let next_check_time = now
            .checked_add(delay)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);

        let record = DeadInstanceRecord {
            delay_factor: factor,
            next_check_time,
            try_count: previous_tries.saturating_add(1),
        };
        dead.insert(key.clone(), record);
        drop(dead);

        if settings.verbose_logging {
            if settings.multiply_factor < 1.0 {
                warn!(
                    multiply_factor = settings.multiply_factor,
                    "Dead instance multiply factor below 1, recheck delays will shrink"
                );
            }
            debug!(
                instance = %key,
                try_count = record.try_count,
                delay_factor = record.delay_factor,
                next_check_secs = delay.as_secs_f64(),
                "Dead instance registered"
            );
        }

        Registration {
            record,
            delay,
            newly_dead: previous.is_none(),
        }
    }

    /// Stop tracking `key`. A no-op when it is not tracked.
    pub fn unregister_instance(&self, key: &InstanceKey) -> Option<DeadInstanceRecord> {
        let removed = self.dead.write().remove(key);

        if let Some(record) = removed {
            self.metrics.instance_removed();
            if self.settings.load().verbose_logging {
                debug!(
                    instance = %key,
                    try_count = record.try_count,
                    "Dead instance unregistered"
                );
            }
        }

        removed
    }

    /// Returns `(is_known_dead, should_recheck_now)`.
    ///
    /// - `(false, false)`: not tracked, probe on the normal cadence.
    /// - `(true, false)`: dead and still inside its backoff window, skip it.
    /// - `(true, true)`: dead and the window has elapsed, probe it now.
    ///
    /// Never mutates state. The caller reports the probe result through
    /// [`register_instance`](Self::register_instance) or
    /// [`unregister_instance`](Self::unregister_instance).
    pub fn instance_recheck_needed(&self, key: &InstanceKey) -> (bool, bool) {
        let dead = self.dead.read();

        let Some(record) = dead.get(key) else {
            return (false, false);
        };

        if record.next_check_time > self.clock.now() {
            return (true, false);
        }

        if self.settings.load().verbose_logging {
            debug!(
                instance = %key,
                try_count = record.try_count,
                "Dead instance recheck due"
            );
        }
        (true, true)
    }

    /// Snapshot of the record for `key`, if tracked.
    pub fn record(&self, key: &InstanceKey) -> Option<DeadInstanceRecord> {
        self.dead.read().get(key).copied()
    }

    /// Number of tracked dead instances.
    pub fn len(&self) -> usize {
        self.dead.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DeadInstanceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadInstanceFilter")
            .field("dead_instances", &self.len())
            .field("settings", &self.settings.load_full())
            .finish()
    }
}
