use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::metrics::snapshot::PeriodicMapMetricsSnapshot;
use crate::metrics::traits::{MetricsReset, PeriodicMapMetricsRecorder};

/// Atomic counters backing [`PeriodicMapMetricsSnapshot`].
#[derive(Debug, Default)]
pub struct PeriodicMapMetrics {
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    put_new: AtomicU64,
    put_updates: AtomicU64,
    remove_calls: AtomicU64,
    remove_found: AtomicU64,
    refresh_successes: AtomicU64,
    refresh_failures: AtomicU64,
    refresh_panics: AtomicU64,
    last_refresh_entries: AtomicUsize,
}

impl PeriodicMapMetrics {
    /// Snapshot counters, filling in the gauges the counters cannot know.
    pub fn snapshot_with(&self, len: usize, running: bool) -> PeriodicMapMetricsSnapshot {
        let get_hits = self.get_hits.load(Ordering::Relaxed);
        let get_misses = self.get_misses.load(Ordering::Relaxed);
        let put_new = self.put_new.load(Ordering::Relaxed);
        let put_updates = self.put_updates.load(Ordering::Relaxed);
        let refresh_successes = self.refresh_successes.load(Ordering::Relaxed);
        let refresh_failures = self.refresh_failures.load(Ordering::Relaxed);

        PeriodicMapMetricsSnapshot {
            get_calls: get_hits + get_misses,
            get_hits,
            get_misses,
            put_calls: put_new + put_updates,
            put_updates,
            put_new,
            remove_calls: self.remove_calls.load(Ordering::Relaxed),
            remove_found: self.remove_found.load(Ordering::Relaxed),
            refresh_attempts: refresh_successes + refresh_failures,
            refresh_successes,
            refresh_failures,
            refresh_panics: self.refresh_panics.load(Ordering::Relaxed),
            last_refresh_entries: self.last_refresh_entries.load(Ordering::Relaxed),
            len,
            running,
        }
    }
}

impl PeriodicMapMetricsRecorder for PeriodicMapMetrics {
    #[inline]
    fn record_get_hit(&self) {
        self.get_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_get_miss(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_put_new(&self) {
        self.put_new.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_put_update(&self) {
        self.put_updates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_remove_call(&self) {
        self.remove_calls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_remove_found(&self) {
        self.remove_found.fetch_add(1, Ordering::Relaxed);
    }

    fn record_refresh_success(&self, entries: usize) {
        self.refresh_successes.fetch_add(1, Ordering::Relaxed);
        self.last_refresh_entries.store(entries, Ordering::Relaxed);
    }

    fn record_refresh_failure(&self, panicked: bool) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
        if panicked {
            self.refresh_panics.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl MetricsReset for PeriodicMapMetrics {
    fn reset_metrics(&self) {
        self.get_hits.store(0, Ordering::Relaxed);
        self.get_misses.store(0, Ordering::Relaxed);
        self.put_new.store(0, Ordering::Relaxed);
        self.put_updates.store(0, Ordering::Relaxed);
        self.remove_calls.store(0, Ordering::Relaxed);
        self.remove_found.store(0, Ordering::Relaxed);
        self.refresh_successes.store(0, Ordering::Relaxed);
        self.refresh_failures.store(0, Ordering::Relaxed);
        self.refresh_panics.store(0, Ordering::Relaxed);
        self.last_refresh_entries.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_totals_add_up() {
        let metrics = PeriodicMapMetrics::default();
        metrics.record_get_hit();
        metrics.record_get_hit();
        metrics.record_get_miss();
        metrics.record_put_new();
        metrics.record_put_update();
        metrics.record_refresh_success(7);
        metrics.record_refresh_failure(true);
        metrics.record_refresh_failure(false);

        let snapshot = metrics.snapshot_with(3, true);
        assert_eq!(snapshot.get_calls, 3);
        assert_eq!(snapshot.get_hits, 2);
        assert_eq!(snapshot.put_calls, 2);
        assert_eq!(snapshot.refresh_attempts, 3);
        assert_eq!(snapshot.refresh_failures, 2);
        assert_eq!(snapshot.refresh_panics, 1);
        assert_eq!(snapshot.last_refresh_entries, 7);
        assert_eq!(snapshot.len, 3);
        assert!(snapshot.running);
    }

    #[test]
    fn failed_refresh_keeps_last_entry_count() {
        let metrics = PeriodicMapMetrics::default();
        metrics.record_refresh_success(4);
        metrics.record_refresh_failure(false);
        assert_eq!(metrics.snapshot_with(0, false).last_refresh_entries, 4);
    }

    #[test]
    fn reset_zeroes_everything() {
        let metrics = PeriodicMapMetrics::default();
        metrics.record_get_hit();
        metrics.record_remove_call();
        metrics.record_remove_found();
        metrics.record_refresh_success(2);
        metrics.reset_metrics();

        assert_eq!(
            metrics.snapshot_with(0, false),
            PeriodicMapMetricsSnapshot::default()
        );
    }
}
