//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! filter + discovery produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (dead-instance gauge, probe counters)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - The filter receives its metrics sink as a `DeadInstanceMetrics` trait
//!   object so it can be tested without a global recorder
//! - Per-instance filter logs are gated by `dead_instances.logs_enabled`

pub mod logging;
pub mod metrics;

pub use self::metrics::{DeadInstanceMetrics, PrometheusDeadInstances};
