//! Backoff tunables consumed by the filter.

use std::time::Duration;

/// Settings read by [`DeadInstanceFilter`](super::DeadInstanceFilter) on every call.
///
/// Values are expected to be validated by the config loader: a multiplier
/// of at least 1 and non-zero intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffSettings {
    /// Interval between regular probes of a healthy instance.
    pub base_poll_interval: Duration,
    /// Growth of the delay factor per consecutive failure. `1.0` keeps the
    /// delay constant at `base_poll_interval`.
    pub multiply_factor: f64,
    /// Hard cap on the wait before a dead instance is rechecked.
    pub max_delay: Duration,
    /// Emit per-instance debug logs.
    pub verbose_logging: bool,
}

impl BackoffSettings {
    /// Whether consecutive failures grow the recheck delay.
    pub fn backoff_enabled(&self) -> bool {
        self.multiply_factor > 1.0
    }

    /// `factor × base_poll_interval`, clamped into the representable range.
    ///
    /// NaN and non-positive products collapse to zero; products too large for
    /// a `Duration` saturate.
    pub(crate) fn scaled_delay(&self, factor: f64) -> Duration {
        let secs = factor * self.base_poll_interval.as_secs_f64();
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            base_poll_interval: Duration::from_secs(5),
            multiply_factor: 1.0,
            max_delay: Duration::from_secs(300),
            verbose_logging: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_secs: u64) -> BackoffSettings {
        BackoffSettings {
            base_poll_interval: Duration::from_secs(base_secs),
            ..Default::default()
        }
    }

    #[test]
    fn scales_base_interval() {
        assert_eq!(settings(10).scaled_delay(2.0), Duration::from_secs(20));
        assert_eq!(settings(10).scaled_delay(1.5), Duration::from_secs(15));
    }

    #[test]
    fn degenerate_factors_do_not_panic() {
        assert_eq!(settings(10).scaled_delay(0.0), Duration::ZERO);
        assert_eq!(settings(10).scaled_delay(-3.0), Duration::ZERO);
        assert_eq!(settings(10).scaled_delay(f64::NAN), Duration::ZERO);
        assert_eq!(settings(10).scaled_delay(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn multiplier_of_one_disables_backoff() {
        assert!(!BackoffSettings::default().backoff_enabled());
        let growing = BackoffSettings {
            multiply_factor: 2.0,
            ..Default::default()
        };
        assert!(growing.backoff_enabled());
    }
}
