/// Point-in-time view of a periodic map's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicMapMetricsSnapshot {
    pub get_calls: u64,
    pub get_hits: u64,
    pub get_misses: u64,

    pub put_calls: u64,
    pub put_updates: u64,
    pub put_new: u64,

    pub remove_calls: u64,
    pub remove_found: u64,

    pub refresh_attempts: u64,
    pub refresh_successes: u64,
    pub refresh_failures: u64,
    pub refresh_panics: u64, // subset of refresh_failures

    // gauges captured at snapshot time
    pub last_refresh_entries: usize,
    pub len: usize,
    pub running: bool,
}

impl PeriodicMapMetricsSnapshot {
    /// Fraction of `get` calls that found their key, or `0.0` with no calls.
    pub fn hit_ratio(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.get_hits as f64 / self.get_calls as f64
        }
    }

    /// Returns `true` if refreshes have failed and none has ever succeeded.
    pub fn has_failed_refresh(&self) -> bool {
        self.refresh_failures > 0 && self.refresh_successes == 0
    }
}
