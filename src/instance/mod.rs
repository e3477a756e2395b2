//! Instance identity.
//!
//! An instance is a monitored endpoint addressed by host and port. The key is
//! the only thing the rest of the crate knows about an instance: the filter
//! uses it as a map key, the scheduler hands it to the prober.

pub mod key;

pub use key::{InstanceKey, InstanceKeyError};
