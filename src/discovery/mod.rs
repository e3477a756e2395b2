//! Discovery subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler.rs, every poll interval:
//!     for each configured instance
//!     → DeadInstanceFilter::instance_recheck_needed
//!         throttled   → skip
//!         not dead    → regular pool
//!         recheck due → dead pool (or regular pool when none is configured)
//!     → probe.rs (Prober)
//!     → register_instance on failure / unregister_instance on success
//! ```
//!
//! # Design Decisions
//! - Dead instances are always registered, even with backoff disabled
//! - An instance is never queued twice; a hung probe only blocks itself
//! - Pools are semaphores, so a slow dead instance cannot starve healthy
//!   ones when the dedicated pool is enabled

pub mod probe;
pub mod scheduler;

pub use probe::{ProbeError, Prober, TcpProber};
pub use scheduler::{DiscoveryOutcome, DiscoveryScheduler};
