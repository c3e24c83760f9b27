//! Counters, snapshots, and exporters for [`PeriodicMap`](crate::map::periodic::PeriodicMap).
//!
//! Enabled by the `metrics` feature (on by default).

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;
