//! wheels: concurrent in-memory maps, including a periodically refreshed
//! key/value cache.
//!
//! ## Modules
//!
//! - [`map::periodic`]: [`PeriodicMap`](map::periodic::PeriodicMap), a map
//!   whose whole contents are replaced on a fixed interval by a fetch
//!   callback running on a background thread.
//! - [`map::concurrent`]: [`ConcurrentMap`](map::concurrent::ConcurrentMap),
//!   a sharded typed concurrent map.
//! - [`builder`]: configuration and validation for periodic maps.
//! - [`listener`]: refresh notifications.
//! - [`metrics`] (feature `metrics`): counters, snapshots, and exporters.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: `debug` for lifecycle and
//! successful refreshes, `error` for failed refreshes. Install any logger
//! (e.g. `env_logger`) to see them.

pub mod builder;
pub mod error;
pub mod listener;
pub mod map;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod traits;
