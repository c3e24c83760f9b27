//! # Concurrent Map Traits
//!
//! Shared `&self` interface over the crate's thread-safe maps, so callers
//! (and benchmarks) can be written once for either container.
//!
//! ```text
//!   ┌───────────────────────────────┐
//!   │   ConcurrentMapRead<K, V>     │
//!   │  get / contains_key / len     │
//!   └───────────────┬───────────────┘
//!                   │
//!                   ▼
//!   ┌───────────────────────────────┐
//!   │   ConcurrentMapWrite<K, V>    │
//!   │  insert / remove              │
//!   └───────────────┬───────────────┘
//!          ┌────────┴─────────┐
//!          ▼                  ▼
//!    PeriodicMap        ConcurrentMap
//! ```
//!
//! All methods take `&self`; implementors synchronize internally. Values are
//! returned by clone because no reference can outlive the internal lock.
//!
//! ## Example Usage
//!
//! ```
//! use wheels::map::concurrent::ConcurrentMap;
//! use wheels::traits::{ConcurrentMapRead, ConcurrentMapWrite};
//!
//! fn bump<M: ConcurrentMapWrite<&'static str, u64>>(map: &M, key: &'static str) {
//!     let next = map.get(&key).unwrap_or(0) + 1;
//!     map.insert(key, next);
//! }
//!
//! let map = ConcurrentMap::new();
//! bump(&map, "hits");
//! bump(&map, "hits");
//! assert_eq!(map.get(&"hits"), Some(2));
//! ```

/// Read-only operations.
pub trait ConcurrentMapRead<K, V> {
    /// Clone of the value for `key`, or `None` if absent.
    fn get(&self, key: &K) -> Option<V>;

    /// Returns `true` if `key` is present.
    fn contains_key(&self, key: &K) -> bool;

    /// Current number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutating operations.
pub trait ConcurrentMapWrite<K, V>: ConcurrentMapRead<K, V> {
    /// Insert or overwrite, returning the previous value.
    fn insert(&self, key: K, value: V) -> Option<V>;

    /// Remove `key`, returning its value. Absent keys are not an error.
    fn remove(&self, key: &K) -> Option<V>;
}
