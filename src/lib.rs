//! Instance discovery with dead-instance backoff.
//!
//! Periodically probes a set of `host:port` instances. Instances whose probe
//! fails are handed to a [`DeadInstanceFilter`], which throttles further
//! probes with an exponential, capped backoff until they answer again.

pub mod config;
pub mod discovery;
pub mod filter;
pub mod instance;
pub mod lifecycle;
pub mod observability;

pub use config::DiscoveryConfig;
pub use discovery::{DiscoveryOutcome, DiscoveryScheduler};
pub use filter::{BackoffSettings, DeadInstanceFilter};
pub use instance::InstanceKey;
pub use lifecycle::DiscoveryTask;
