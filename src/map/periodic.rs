//! Concurrent key/value map whose contents are periodically replaced by a
//! background refresh thread.
//!
//! ## Architecture
//!
//! ```text
//!   callers (any thread)                       refresh thread (one per start)
//!   ─────────────────────                      ──────────────────────────────
//!   put / remove ──┐                           loop {
//!                  ├──▶ RwLock<HashMap<K, V>>◀──   state still ours? else exit
//!   get ───────────┘      shared / exclusive        sleep(interval)
//!                                                   write lock + fetch() + swap
//!   start / stop ────▶ AtomicU64 state ◀────────    notify listener
//!                      (running bit + epoch)     }
//! ```
//!
//! - The store lock and the lifecycle state are separate primitives: `stop()`
//!   only touches the atomic and never waits for the data lock.
//! - A refresh is a *full replace*: entries written with `put` or removed with
//!   `remove` since the previous refresh are discarded by the next one.
//! - The fetch callback runs while the write lock is held, so readers see
//!   either the old snapshot or the new one, never a mix.
//! - The interval is measured from the end of one refresh to the start of the
//!   next; fetches never overlap.
//!
//! ## Lifecycle
//!
//! ```text
//!   Idle ──start()──▶ Waiting ──interval──▶ Refreshing ──done/failed──▶ Waiting
//!                        │                                                 │
//!                        └─────────── state changed (stop) ──▶ Exited ◀────┘
//! ```
//!
//! `stop()` is cooperative: a sleeping loop finishes its sleep, and an
//! in-flight fetch completes, before the thread exits. `shutdown()` also
//! wakes the sleeping thread and joins it.
//!
//! ## Failure Handling
//!
//! The fetch callback is invoked inside one `catch_unwind` boundary. A panic,
//! or an `Err` from a fallible fetch, becomes a [`RefreshError`]: it is logged,
//! counted, handed to the listener, and the store keeps its previous value.
//! The refresh thread keeps running.
//!
//! ## Example Usage
//!
//! ```
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! use wheels::map::periodic::PeriodicMap;
//!
//! let map = PeriodicMap::new(Duration::from_secs(60), || {
//!     HashMap::from([(1, "one"), (2, "two"), (3, "three")])
//! });
//!
//! map.refresh_now().unwrap();
//! assert_eq!(map.get(&1), Some("one"));
//!
//! map.put(4, "four");
//! map.remove(&2);
//! assert_eq!(map.get(&4), Some("four"));
//! assert_eq!(map.get(&2), None);
//!
//! map.start();
//! map.shutdown();
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use parking_lot::{Mutex, RwLock};

use crate::builder::PeriodicMapBuilder;
use crate::error::{ConfigError, FetchError, RefreshError};
use crate::listener::{RefreshEvent, RefreshListener};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::PeriodicMapMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::PeriodicMapMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{MetricsReset, MetricsSnapshotProvider, PeriodicMapMetricsRecorder};
use crate::traits::{ConcurrentMapRead, ConcurrentMapWrite};

/// Boxed fetch callback. Infallible callbacks are wrapped to always return `Ok`.
pub(crate) type FetchFn<K, V> =
    Box<dyn Fn() -> Result<HashMap<K, V>, FetchError> + Send + Sync + 'static>;

/// Low bit of the lifecycle word.
const RUNNING: u64 = 1;

/// State shared between the map handle and its refresh thread.
pub(crate) struct Shared<K, V> {
    store: RwLock<HashMap<K, V>>,
    /// `epoch << 1 | running`. Every successful `start` bumps the epoch, so a
    /// loop left over from an earlier start sees a different word and exits.
    state: AtomicU64,
    interval: Duration,
    fetch: FetchFn<K, V>,
    listener: Option<Box<dyn RefreshListener>>,
    refresh_on_start: bool,
    thread_name: String,
    #[cfg(feature = "metrics")]
    metrics: PeriodicMapMetrics,
}

/// Settings collected by [`PeriodicMapBuilder`].
pub(crate) struct Settings<K, V> {
    pub(crate) interval: Duration,
    pub(crate) fetch: FetchFn<K, V>,
    pub(crate) listener: Option<Box<dyn RefreshListener>>,
    pub(crate) refresh_on_start: bool,
    pub(crate) initial: HashMap<K, V>,
    pub(crate) thread_name: String,
}

/// Default name of the refresh thread.
pub(crate) const DEFAULT_THREAD_NAME: &str = "periodic-map-refresh";

impl<K, V> Shared<K, V> {
    #[inline]
    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) & RUNNING != 0
    }

    /// Returns `true` while `token` is still the current lifecycle word.
    #[inline]
    fn is_current(&self, token: u64) -> bool {
        self.state.load(Ordering::Acquire) == token
    }

    /// Flip the running bit on; returns the new word, or `None` if already
    /// running.
    fn try_begin(&self) -> Option<u64> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & RUNNING != 0 {
                return None;
            }
            let next = (((current >> 1) + 1) << 1) | RUNNING;
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Clear the running bit; returns whether it was set.
    fn halt(&self) -> bool {
        self.state.fetch_and(!RUNNING, Ordering::AcqRel) & RUNNING != 0
    }
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash,
{
    /// Refresh loop body. Exits as soon as the lifecycle word moves on.
    fn run(&self, token: u64) {
        debug!(
            "{}: refresh loop started (interval {:?})",
            self.thread_name, self.interval
        );
        if self.refresh_on_start && self.is_current(token) {
            let _ = self.refresh();
        }
        while self.is_current(token) {
            if !self.sleep_interval(token) {
                break;
            }
            let _ = self.refresh();
        }
        debug!("{}: refresh loop exited", self.thread_name);
    }

    /// Sleep for one interval. Returns `false` if the loop should exit.
    ///
    /// `stop()` does not wake the thread, so a stopped loop normally sleeps
    /// out its interval. `shutdown()` and `Drop` unpark it.
    fn sleep_interval(&self, token: u64) -> bool {
        let deadline = Instant::now() + self.interval;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return self.is_current(token);
            }
            thread::park_timeout(deadline - now);
            if !self.is_current(token) {
                return false;
            }
        }
    }

    /// One refresh step: fetch under the write lock and swap on success.
    fn refresh(&self) -> Result<usize, RefreshError> {
        let (outcome, previous, elapsed) = {
            let mut store = self.store.write();
            // timed from lock acquisition, so waiting on readers is excluded
            let started = Instant::now();
            let fetched = panic::catch_unwind(AssertUnwindSafe(|| (self.fetch)()));
            let elapsed = started.elapsed();
            match fetched {
                Ok(Ok(snapshot)) => {
                    let entries = snapshot.len();
                    (Ok(entries), Some(mem::replace(&mut *store, snapshot)), elapsed)
                },
                Ok(Err(err)) => (Err(RefreshError::Fetch(err)), None, elapsed),
                Err(payload) => (Err(RefreshError::from_panic(payload)), None, elapsed),
            }
        };
        // old snapshot is dropped outside the lock
        drop(previous);

        match &outcome {
            Ok(entries) => {
                debug!(
                    "{}: refreshed {} entries in {:?}",
                    self.thread_name, entries, elapsed
                );
                #[cfg(feature = "metrics")]
                self.metrics.record_refresh_success(*entries);
                self.notify(&RefreshEvent::Completed {
                    entries: *entries,
                    elapsed,
                });
            },
            Err(err) => {
                error!(
                    "{}: refresh failed after {:?}, keeping previous snapshot: {}",
                    self.thread_name, elapsed, err
                );
                #[cfg(feature = "metrics")]
                self.metrics.record_refresh_failure(err.is_panic());
                self.notify(&RefreshEvent::Failed {
                    error: err,
                    elapsed,
                });
            },
        }
        outcome
    }

    fn notify(&self, event: &RefreshEvent<'_>) {
        let Some(listener) = &self.listener else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| listener.on_refresh(event))).is_err() {
            warn!("{}: refresh listener panicked", self.thread_name);
        }
    }
}

/// Thread-safe key/value map refreshed from a fetch callback on a fixed
/// interval.
///
/// Point operations (`put`, `get`, `remove`) are available whether or not
/// the refresh thread is running. See the [module docs](self) for the
/// refresh semantics.
pub struct PeriodicMap<K, V> {
    shared: Arc<Shared<K, V>>,
    /// Handles of loop threads that may still be alive. Usually one; a
    /// `stop()` → `start()` cycle can leave a superseded loop finishing its
    /// last sleep or fetch.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<K, V> PeriodicMap<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a stopped map with an empty store.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero. See [`try_new`](Self::try_new).
    pub fn new<F>(interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> HashMap<K, V> + Send + Sync + 'static,
    {
        match Self::try_new(interval, fetch) {
            Ok(map) => map,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a stopped map, returning an error on invalid parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `interval` is zero.
    pub fn try_new<F>(interval: Duration, fetch: F) -> Result<Self, ConfigError>
    where
        F: Fn() -> HashMap<K, V> + Send + Sync + 'static,
    {
        PeriodicMapBuilder::new(interval).fetch(fetch).try_build()
    }

    /// Starts configuring a map with the given refresh interval.
    pub fn builder(interval: Duration) -> PeriodicMapBuilder<K, V> {
        PeriodicMapBuilder::new(interval)
    }

    pub(crate) fn from_settings(settings: Settings<K, V>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: RwLock::new(settings.initial),
                state: AtomicU64::new(0),
                interval: settings.interval,
                fetch: settings.fetch,
                listener: settings.listener,
                refresh_on_start: settings.refresh_on_start,
                thread_name: settings.thread_name,
                #[cfg(feature = "metrics")]
                metrics: PeriodicMapMetrics::default(),
            }),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Inserts or overwrites an entry, returning the previous value.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let previous = self.shared.store.write().insert(key, value);
        #[cfg(feature = "metrics")]
        if previous.is_some() {
            self.shared.metrics.record_put_update();
        } else {
            self.shared.metrics.record_put_new();
        }
        previous
    }

    /// Returns a clone of the value for `key`, or `None` if absent.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Applies `f` to the value for `key` under the read lock.
    ///
    /// Avoids cloning large values; `f` should be short since it delays
    /// writers and refreshes.
    pub fn get_with<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> R,
    {
        let result = self.shared.store.read().get(key).map(f);
        #[cfg(feature = "metrics")]
        if result.is_some() {
            self.shared.metrics.record_get_hit();
        } else {
            self.shared.metrics.record_get_miss();
        }
        result
    }

    /// Removes the entry for `key`, returning its value. Absent keys are not
    /// an error.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.shared.store.write().remove(key);
        #[cfg(feature = "metrics")]
        {
            self.shared.metrics.record_remove_call();
            if removed.is_some() {
                self.shared.metrics.record_remove_found();
            }
        }
        removed
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shared.store.read().contains_key(key)
    }

    /// Number of entries currently in the store.
    pub fn len(&self) -> usize {
        self.shared.store.read().len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.shared.store.read().is_empty()
    }

    /// Clones the whole store as one consistent snapshot.
    pub fn snapshot(&self) -> HashMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.shared.store.read().clone()
    }

    /// Configured refresh interval.
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Returns `true` between a `start()` and the next `stop()`.
    ///
    /// A stopped map may still have a refresh thread finishing its last
    /// sleep or fetch.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Starts the refresh thread. A no-op if already running.
    ///
    /// Concurrent callers race on a single compare-exchange; only the one
    /// that flips the map from stopped to running spawns a thread. The first
    /// refresh happens one interval after the loop begins, unless the map
    /// was built with `refresh_on_start`.
    pub fn start(&self) {
        // Held across the transition and the spawn so handles are recorded
        // in the order their tokens were issued. `stop()` never takes it.
        let mut workers = self.workers.lock();
        let Some(token) = self.shared.try_begin() else {
            return;
        };
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.shared.thread_name.clone())
            .spawn(move || shared.run(token));

        match spawned {
            Ok(handle) => {
                workers.retain(|previous| !previous.is_finished());
                // Loops from earlier starts no longer own the current token;
                // wake them so they exit instead of sleeping out the interval.
                for previous in workers.iter() {
                    previous.thread().unpark();
                }
                workers.push(handle);
            },
            Err(err) => {
                error!(
                    "{}: failed to spawn refresh thread: {}",
                    self.shared.thread_name, err
                );
                // only undo our own transition
                let _ = self.shared.state.compare_exchange(
                    token,
                    token & !RUNNING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            },
        }
    }

    /// Requests the refresh thread to stop and returns immediately.
    ///
    /// Does not interrupt a sleep or an in-flight fetch; the loop exits the
    /// next time it checks its state. Harmless on a stopped map.
    pub fn stop(&self) {
        if self.shared.halt() {
            debug!("{}: stop requested", self.shared.thread_name);
        }
    }

    /// Stops the map, wakes its refresh threads, and waits for them to exit.
    ///
    /// An in-flight fetch is still waited for. Calling this from inside the
    /// fetch callback or a listener stops the map without joining the
    /// calling thread.
    pub fn shutdown(&self) {
        self.stop();
        let handles = mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for handle in &handles {
            handle.thread().unpark();
        }
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("{}: refresh thread panicked", self.shared.thread_name);
            }
        }
    }

    /// Runs one refresh step on the calling thread.
    ///
    /// Uses the same lock, failure isolation, logging, and listener
    /// notification as the background loop. Returns the number of entries
    /// installed.
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] if the fetch panicked or failed; the store is
    /// left unchanged.
    pub fn refresh_now(&self) -> Result<usize, RefreshError> {
        self.shared.refresh()
    }

    /// Snapshot of the map's counters and gauges.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> PeriodicMapMetricsSnapshot {
        self.shared
            .metrics
            .snapshot_with(self.len(), self.is_running())
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<PeriodicMapMetricsSnapshot> for PeriodicMap<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn snapshot(&self) -> PeriodicMapMetricsSnapshot {
        self.metrics()
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsReset for PeriodicMap<K, V> {
    fn reset_metrics(&self) {
        self.shared.metrics.reset_metrics();
    }
}

impl<K, V> ConcurrentMapRead<K, V> for PeriodicMap<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<V> {
        PeriodicMap::get(self, key)
    }

    fn contains_key(&self, key: &K) -> bool {
        PeriodicMap::contains_key(self, key)
    }

    fn len(&self) -> usize {
        PeriodicMap::len(self)
    }
}

impl<K, V> ConcurrentMapWrite<K, V> for PeriodicMap<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn insert(&self, key: K, value: V) -> Option<V> {
        self.put(key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        PeriodicMap::remove(self, key)
    }
}

impl<K, V> fmt::Debug for PeriodicMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicMap")
            .field("interval", &self.shared.interval)
            .field("running", &self.shared.is_running())
            .field("len", &self.shared.store.read().len())
            .field("thread_name", &self.shared.thread_name)
            .finish()
    }
}

impl<K, V> Drop for PeriodicMap<K, V> {
    fn drop(&mut self) {
        self.shared.halt();
        for handle in self.workers.get_mut().drain(..) {
            handle.thread().unpark();
        }
    }
}
