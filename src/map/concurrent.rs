//! Typed concurrent hash map with per-shard locking.
//!
//! ## Architecture
//! - Keys are spread over a fixed number of shards, each a
//!   `RwLock<HashMap<K, V, S>>`, chosen by hashing the key with the map's
//!   `BuildHasher` (`FxBuildHasher` by default).
//! - Every single-key operation locks exactly one shard, so it is atomic with
//!   respect to other operations on the same key.
//! - Whole-map views (`range`, `len`, `keys`, `values`) visit shards one at a
//!   time and are not a consistent snapshot across shards.
//!
//! ## Core Operations
//! - `get` / `insert` / `remove`: load, store-or-swap, load-and-delete.
//! - `get_or_insert`: load-or-store, reporting whether the value was loaded.
//! - `compare_and_swap` / `compare_and_remove`: conditional on the current
//!   value (`V: PartialEq`).
//! - `range`: visit entries until the callback returns `false`.
//!
//! ## Example Usage
//! ```rust
//! use wheels::map::concurrent::ConcurrentMap;
//!
//! let map: ConcurrentMap<&str, u32> = ConcurrentMap::new();
//! assert_eq!(map.get_or_insert("a", 1), (1, false));
//! assert_eq!(map.get_or_insert("a", 2), (1, true));
//! assert!(map.compare_and_swap(&"a", &1, 5));
//! assert!(!map.compare_and_remove(&"a", &1));
//! assert_eq!(map.remove(&"a"), Some(5));
//! assert!(map.is_empty());
//! ```
//!
//! ## Thread Safety
//! - `ConcurrentMap` is `Send + Sync` when `K`, `V`, and `S` are.
//! - Callbacks passed to `range` and `get_with` run under a shard read lock;
//!   they must not write to the same map.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::traits::{ConcurrentMapRead, ConcurrentMapWrite};

/// Shard count used by [`ConcurrentMap::new`].
pub const DEFAULT_SHARDS: usize = 16;

/// Concurrent map with sharded reader/writer locks.
pub struct ConcurrentMap<K, V, S = FxBuildHasher> {
    shards: Box<[RwLock<HashMap<K, V, S>>]>,
    hasher: S,
}

impl<K, V> ConcurrentMap<K, V, FxBuildHasher>
where
    K: Eq + Hash,
{
    /// Create a map with [`DEFAULT_SHARDS`] shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a map with the given shard count (at least one).
    pub fn with_shards(shards: usize) -> Self {
        Self::with_hasher(shards, FxBuildHasher)
    }
}

impl<K, V> Default for ConcurrentMap<K, V, FxBuildHasher>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Create a map with a custom hasher, used both for shard selection and
    /// inside each shard.
    pub fn with_hasher(shards: usize, hasher: S) -> Self {
        let shard_count = shards.max(1);
        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::with_hasher(hasher.clone())))
            .collect();
        Self { shards, hasher }
    }

    /// Return the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard<Q>(&self, key: &Q) -> &RwLock<HashMap<K, V, S>>
    where
        Q: Hash + ?Sized,
    {
        let idx = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Clone of the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.shard(key).read().get(key).cloned()
    }

    /// Apply `f` to the value for `key` under the shard read lock.
    pub fn get_with<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> R,
    {
        self.shard(key).read().get(key).map(f)
    }

    /// Check whether a key exists.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shard(key).read().contains_key(key)
    }

    /// Insert or overwrite, returning the previous value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.shard(&key).write().insert(key, value)
    }

    /// Remove a key, returning its value if it was present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shard(key).write().remove(key)
    }

    /// Return the existing value, or insert `value` and return it.
    ///
    /// The flag is `true` if the value was already present (loaded).
    pub fn get_or_insert(&self, key: K, value: V) -> (V, bool)
    where
        V: Clone,
    {
        self.get_or_insert_with(key, || value)
    }

    /// Like [`get_or_insert`](Self::get_or_insert), building the value only
    /// when the key is absent.
    pub fn get_or_insert_with<F>(&self, key: K, make: F) -> (V, bool)
    where
        V: Clone,
        F: FnOnce() -> V,
    {
        let mut shard = self.shard(&key).write();
        match shard.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), true),
            Entry::Vacant(entry) => (entry.insert(make()).clone(), false),
        }
    }

    /// Replace the value for `key` with `new` only if it currently equals
    /// `old`.
    pub fn compare_and_swap<Q>(&self, key: &Q, old: &V, new: V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let mut shard = self.shard(key).write();
        match shard.get_mut(key) {
            Some(current) if *current == *old => {
                *current = new;
                true
            },
            _ => false,
        }
    }

    /// Remove `key` only if its value currently equals `old`.
    pub fn compare_and_remove<Q>(&self, key: &Q, old: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: PartialEq,
    {
        let mut shard = self.shard(key).write();
        if shard.get(key).is_some_and(|current| current == old) {
            shard.remove(key);
            true
        } else {
            false
        }
    }

    /// Visit entries shard by shard until `f` returns `false`.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for shard in self.shards.iter() {
            let shard = shard.read();
            for (key, value) in shard.iter() {
                if !f(key, value) {
                    return;
                }
            }
        }
    }

    /// Drop all entries.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.write().clear();
        }
    }

    /// Number of entries, summed shard by shard.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Returns `true` if every shard is empty.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Clone all keys.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut keys = Vec::with_capacity(self.len());
        self.range(|key, _| {
            keys.push(key.clone());
            true
        });
        keys
    }

    /// Clone all values.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let mut values = Vec::with_capacity(self.len());
        self.range(|_, value| {
            values.push(value.clone());
            true
        });
        values
    }
}

impl<K, V, S> ConcurrentMapRead<K, V> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        ConcurrentMap::get(self, key)
    }

    fn contains_key(&self, key: &K) -> bool {
        ConcurrentMap::contains_key(self, key)
    }

    fn len(&self) -> usize {
        ConcurrentMap::len(self)
    }
}

impl<K, V, S> ConcurrentMapWrite<K, V> for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn insert(&self, key: K, value: V) -> Option<V> {
        ConcurrentMap::insert(self, key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        ConcurrentMap::remove(self, key)
    }
}

impl<K, V> FromIterator<(K, V)> for ConcurrentMap<K, V, FxBuildHasher>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K, V, S> fmt::Debug for ConcurrentMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentMap")
            .field("len", &self.len())
            .field("shards", &self.shard_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::RandomState;

    use super::*;

    #[test]
    fn insert_returns_previous_value() {
        let map = ConcurrentMap::new();
        assert_eq!(map.insert("k", 1), None);
        assert_eq!(map.insert("k", 2), Some(1));
        assert_eq!(map.get(&"k"), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_missing_key_is_none() {
        let map: ConcurrentMap<u32, u32> = ConcurrentMap::new();
        assert_eq!(map.remove(&3), None);
        assert!(map.is_empty());
    }

    #[test]
    fn get_or_insert_with_builds_once() {
        let map: ConcurrentMap<u32, String> = ConcurrentMap::new();
        let mut built = 0;
        let (v, loaded) = map.get_or_insert_with(1, || {
            built += 1;
            "a".to_string()
        });
        assert_eq!((v.as_str(), loaded), ("a", false));

        let (v, loaded) = map.get_or_insert_with(1, || {
            built += 1;
            "b".to_string()
        });
        assert_eq!((v.as_str(), loaded), ("a", true));
        assert_eq!(built, 1);
    }

    #[test]
    fn compare_and_swap_requires_match() {
        let map = ConcurrentMap::new();
        map.insert(1, 10);
        assert!(!map.compare_and_swap(&1, &11, 12));
        assert_eq!(map.get(&1), Some(10));
        assert!(map.compare_and_swap(&1, &10, 12));
        assert_eq!(map.get(&1), Some(12));
        assert!(!map.compare_and_swap(&2, &10, 12));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn compare_and_remove_requires_match() {
        let map = ConcurrentMap::new();
        map.insert(1, 10);
        assert!(!map.compare_and_remove(&1, &11));
        assert!(map.compare_and_remove(&1, &10));
        assert!(!map.contains_key(&1));
    }

    #[test]
    fn range_stops_when_callback_returns_false() {
        let map: ConcurrentMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
        let mut visited = 0;
        map.range(|_, _| {
            visited += 1;
            visited < 10
        });
        assert_eq!(visited, 10);
    }

    #[test]
    fn keys_values_and_clear() {
        let map: ConcurrentMap<u32, u32> = (0..50).map(|i| (i, i * 2)).collect();
        let mut keys = map.keys();
        keys.sort_unstable();
        assert_eq!(keys, (0..50).collect::<Vec<_>>());

        let sum: u32 = map.values().into_iter().sum();
        assert_eq!(sum, (0..50).map(|i| i * 2).sum::<u32>());

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn borrowed_lookups() {
        let map: ConcurrentMap<String, usize> = ConcurrentMap::new();
        map.insert("alpha".to_string(), 5);
        assert_eq!(map.get("alpha"), Some(5));
        assert_eq!(map.get_with("alpha", |v| v + 1), Some(6));
        assert_eq!(map.remove("alpha"), Some(5));
    }

    #[test]
    fn zero_shards_coerced_to_one() {
        let map: ConcurrentMap<u8, u8> = ConcurrentMap::with_shards(0);
        assert_eq!(map.shard_count(), 1);
        map.insert(1, 1);
        assert_eq!(map.get(&1), Some(1));
    }

    #[test]
    fn custom_hasher() {
        let map: ConcurrentMap<u64, u64, RandomState> =
            ConcurrentMap::with_hasher(4, RandomState::new());
        for i in 0..64 {
            map.insert(i, i);
        }
        assert_eq!(map.len(), 64);
        assert_eq!(map.shard_count(), 4);
    }

    #[test]
    fn debug_reports_len_and_shards() {
        let map: ConcurrentMap<u8, u8> = ConcurrentMap::with_shards(2);
        map.insert(1, 1);
        assert_eq!(format!("{:?}", map), "ConcurrentMap { len: 1, shards: 2 }");
    }

    mod property_tests {
        use std::collections::HashMap;

        use proptest::prelude::*;

        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(u8, u16),
            Remove(u8),
            GetOrInsert(u8, u16),
            CompareAndSwap(u8, u16, u16),
            CompareAndRemove(u8, u16),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
                any::<u8>().prop_map(Op::Remove),
                (any::<u8>(), any::<u16>()).prop_map(|(k, v)| Op::GetOrInsert(k, v)),
                (any::<u8>(), 0u16..4, any::<u16>())
                    .prop_map(|(k, old, new)| Op::CompareAndSwap(k, old, new)),
                (any::<u8>(), 0u16..4).prop_map(|(k, old)| Op::CompareAndRemove(k, old)),
            ]
        }

        proptest! {
            #[test]
            fn matches_hashmap_model(ops in prop::collection::vec(op(), 0..200)) {
                let map: ConcurrentMap<u8, u16> = ConcurrentMap::with_shards(4);
                let mut model: HashMap<u8, u16> = HashMap::new();

                for op in ops {
                    match op {
                        Op::Insert(k, v) => {
                            prop_assert_eq!(map.insert(k, v), model.insert(k, v));
                        },
                        Op::Remove(k) => {
                            prop_assert_eq!(map.remove(&k), model.remove(&k));
                        },
                        Op::GetOrInsert(k, v) => {
                            let expected = match model.get(&k) {
                                Some(existing) => (*existing, true),
                                None => {
                                    model.insert(k, v);
                                    (v, false)
                                },
                            };
                            prop_assert_eq!(map.get_or_insert(k, v), expected);
                        },
                        Op::CompareAndSwap(k, old, new) => {
                            let expected = model.get(&k) == Some(&old);
                            if expected {
                                model.insert(k, new);
                            }
                            prop_assert_eq!(map.compare_and_swap(&k, &old, new), expected);
                        },
                        Op::CompareAndRemove(k, old) => {
                            let expected = model.get(&k) == Some(&old);
                            if expected {
                                model.remove(&k);
                            }
                            prop_assert_eq!(map.compare_and_remove(&k, &old), expected);
                        },
                    }
                }

                prop_assert_eq!(map.len(), model.len());
                for (k, v) in &model {
                    prop_assert_eq!(map.get(k), Some(*v));
                }
            }
        }
    }
}
