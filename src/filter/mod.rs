//! Dead-instance backoff filter.
//!
//! # Data Flow
//! ```text
//! Discovery worker, before probing:
//!     → instance_recheck_needed(key)
//!         (false, false): not dead, probe normally
//!         (true,  false): dead, inside backoff window, skip
//!         (true,  true):  dead, window elapsed, probe now
//!
//! After probing:
//!     probe failed    → register_instance(key)   (grow delay, push next check)
//!     probe succeeded → unregister_instance(key) (forget the instance)
//! ```
//!
//! # State Machine (per instance)
//! ```text
//! Untracked → Dead(waiting) → Dead(recheck due) → Dead(waiting)   probe still failing
//!                                               → Untracked       probe succeeded
//! ```
//! `waiting` and `recheck due` are derived from the clock, not stored.
//!
//! # Backoff
//! `delay = factor × base_poll_interval`, where `factor` is multiplied by the
//! configured multiplier on every failure. When the delay would exceed
//! `max_delay` it is pinned there and the factor stops growing.

pub mod clock;
pub mod dead;
pub mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dead::{DeadInstanceFilter, DeadInstanceRecord, Registration};
pub use settings::BackoffSettings;
