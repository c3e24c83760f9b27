//! Thread-safe maps.
//!
//! - [`periodic::PeriodicMap`]: one lock, contents periodically replaced by a
//!   fetch callback on a background thread.
//! - [`concurrent::ConcurrentMap`]: sharded locks, no background activity.

pub mod concurrent;
pub mod periodic;
