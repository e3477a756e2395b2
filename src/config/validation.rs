//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and consistency.
//! All problems are reported at once, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::DiscoveryConfig;
use crate::instance::InstanceKey;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("dead_instances.poll_secs_multiply_factor must be a finite number >= 1, got {0}")]
    MultiplyFactor(f64),

    #[error("instance {0} is listed more than once")]
    DuplicateInstance(InstanceKey),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &DiscoveryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let zero = [
        ("polling.instance_poll_secs", config.polling.instance_poll_secs == 0),
        ("polling.probe_timeout_secs", config.polling.probe_timeout_secs == 0),
        ("polling.max_concurrency", config.polling.max_concurrency == 0),
        ("dead_instances.poll_secs_max", config.dead_instances.poll_secs_max == 0),
    ];
    for (field, _) in zero.into_iter().filter(|(_, is_zero)| *is_zero) {
        errors.push(ValidationError::NotPositive { field });
    }

    let factor = config.dead_instances.poll_secs_multiply_factor;
    if !factor.is_finite() || factor < 1.0 {
        errors.push(ValidationError::MultiplyFactor(factor));
    }

    let mut seen = HashSet::new();
    for key in &config.polling.instances {
        if !seen.insert(key) {
            errors.push(ValidationError::DuplicateInstance(key.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
