//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files. Every
//! field has a default, so an empty file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::BackoffSettings;
use crate::instance::InstanceKey;

/// Root configuration for the discovery daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Regular polling of instances.
    pub polling: PollingConfig,

    /// Throttling of instances whose last probe failed.
    pub dead_instances: DeadInstanceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl DiscoveryConfig {
    /// Backoff tunables handed to the dead-instance filter.
    pub fn backoff_settings(&self) -> BackoffSettings {
        BackoffSettings {
            base_poll_interval: self.polling.poll_interval(),
            multiply_factor: self.dead_instances.poll_secs_multiply_factor,
            max_delay: Duration::from_secs(self.dead_instances.poll_secs_max),
            verbose_logging: self.dead_instances.logs_enabled,
        }
    }
}

/// Regular polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between probes of a healthy instance.
    pub instance_poll_secs: u64,

    /// Probe timeout in seconds.
    pub probe_timeout_secs: u64,

    /// Concurrent probes of the regular discovery pool.
    pub max_concurrency: usize,

    /// Instances to poll, as `host:port`.
    pub instances: Vec<InstanceKey>,
}

impl PollingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.instance_poll_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            instance_poll_secs: 5,
            probe_timeout_secs: 3,
            max_concurrency: 300,
            instances: Vec::new(),
        }
    }
}

/// Dead-instance throttling configuration.
///
/// | `discovery_max_concurrency` | `poll_secs_multiply_factor` | behaviour |
/// |---|---|---|
/// | `> 0` | `> 1` | dedicated pool, exponential backoff |
/// | `0`   | `> 1` | shared pool, exponential backoff |
/// | `> 0` | `1`   | dedicated pool, fixed recheck delay |
/// | `0`   | `1`   | shared pool, fixed recheck delay (default) |
///
/// Dead instances are always tracked so the dead-instance gauge stays accurate.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DeadInstanceConfig {
    /// Growth of the recheck delay per consecutive failure (>= 1).
    pub poll_secs_multiply_factor: f64,

    /// Upper bound on the recheck delay in seconds.
    pub poll_secs_max: u64,

    /// Size of the dedicated dead-instance probe pool; 0 shares the regular pool.
    pub discovery_max_concurrency: usize,

    /// Log every dead-instance registration, removal and recheck.
    pub logs_enabled: bool,
}

impl Default for DeadInstanceConfig {
    fn default() -> Self {
        Self {
            poll_secs_multiply_factor: 1.0,
            poll_secs_max: 300,
            discovery_max_concurrency: 0,
            logs_enabled: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
