//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DiscoveryConfig (validated)
//!     → DiscoveryScheduler, which hands backoff settings to the filter
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → DiscoveryScheduler::apply_config swaps it in atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Poll interval and pool sizes are fixed at startup; backoff tunables and
//!   the instance list can be reloaded

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{DeadInstanceConfig, DiscoveryConfig, ObservabilityConfig, PollingConfig};
pub use validation::ValidationError;
