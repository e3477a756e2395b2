//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build filter + scheduler → Run discovery
//!
//! Shutdown (shutdown.rs):
//!     DiscoveryTask::stop → Discovery loop exits, in-flight probes aborted
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::DiscoveryTask;
