//! # Metrics Trait Hierarchy
//!
//! Recording, snapshotting, and export are split into small traits so the
//! map's hot paths only ever touch a recorder, while monitoring code only
//! ever sees snapshots.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────┐
//!   │   PeriodicMapMetricsRecorder     │   written by PeriodicMap
//!   │  get_hit/get_miss/put/remove     │   (all &self, atomics)
//!   │  refresh_success/refresh_failure │
//!   └────────────────┬─────────────────┘
//!                    │
//!                    ▼
//!   ┌──────────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>       │───▶│ MetricsExporter<S>           │
//!   │ (tests, dashboards)              │    │ (production monitoring)      │
//!   └──────────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Recorders take `&self` because the map is shared across threads; every
//! counter is an independent relaxed atomic, so a snapshot is not a
//! consistent cut across counters.

/// Counters written by [`PeriodicMap`](crate::map::periodic::PeriodicMap).
pub trait PeriodicMapMetricsRecorder {
    fn record_get_hit(&self);
    fn record_get_miss(&self);
    fn record_put_new(&self);
    fn record_put_update(&self);
    fn record_remove_call(&self);
    fn record_remove_found(&self);
    fn record_refresh_success(&self, entries: usize);
    fn record_refresh_failure(&self, panicked: bool);
}

/// Produce a point-in-time snapshot of metrics.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Publish a snapshot to a monitoring backend.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
