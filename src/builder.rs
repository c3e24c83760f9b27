//! Builder for [`PeriodicMap`].
//!
//! Collects the refresh interval, the fetch callback, and the optional
//! listener and seed data, then validates them in one place.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! use wheels::builder::PeriodicMapBuilder;
//!
//! let map = PeriodicMapBuilder::new(Duration::from_secs(30))
//!     .try_fetch(|| -> Result<HashMap<String, f64>, String> {
//!         Ok(HashMap::from([("BTC-USDT".to_string(), 67_000.0)]))
//!     })
//!     .initial(HashMap::from([("BTC-USDT".to_string(), 0.0)]))
//!     .thread_name("ticker-refresh")
//!     .try_build()
//!     .unwrap();
//!
//! assert_eq!(map.get("BTC-USDT"), Some(0.0));
//! map.refresh_now().unwrap();
//! assert_eq!(map.get("BTC-USDT"), Some(67_000.0));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use crate::error::{ConfigError, FetchError};
use crate::listener::{RefreshEvent, RefreshListener};
use crate::map::periodic::{DEFAULT_THREAD_NAME, FetchFn, PeriodicMap, Settings};

/// Step-by-step configuration of a [`PeriodicMap`].
pub struct PeriodicMapBuilder<K, V> {
    interval: Duration,
    fetch: Option<FetchFn<K, V>>,
    listener: Option<Box<dyn RefreshListener>>,
    refresh_on_start: bool,
    initial: HashMap<K, V>,
    thread_name: String,
}

impl<K, V> PeriodicMapBuilder<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Starts a builder with the given refresh interval and no fetch callback.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            fetch: None,
            listener: None,
            refresh_on_start: false,
            initial: HashMap::new(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }

    /// Sets an infallible fetch callback producing the full replacement map.
    ///
    /// The callback runs while the store's write lock is held, so it must not
    /// read or write the map it is refreshing.
    pub fn fetch<F>(mut self, fetch: F) -> Self
    where
        F: Fn() -> HashMap<K, V> + Send + Sync + 'static,
    {
        self.fetch = Some(Box::new(move || -> Result<HashMap<K, V>, FetchError> {
            Ok(fetch())
        }));
        self
    }

    /// Sets a fallible fetch callback. An `Err` is handled like a panicking
    /// fetch: logged, reported, and the store is left unchanged.
    pub fn try_fetch<F, E>(mut self, fetch: F) -> Self
    where
        F: Fn() -> Result<HashMap<K, V>, E> + Send + Sync + 'static,
        E: Into<FetchError>,
    {
        self.fetch = Some(Box::new(move || -> Result<HashMap<K, V>, FetchError> {
            fetch().map_err(Into::into)
        }));
        self
    }

    /// Registers a listener notified after every refresh step.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: RefreshListener + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Registers a closure as the refresh listener.
    pub fn on_refresh<F>(self, f: F) -> Self
    where
        F: Fn(&RefreshEvent<'_>) + Send + Sync + 'static,
    {
        self.listener(f)
    }

    /// Fetch once as soon as the refresh thread starts, instead of waiting
    /// one interval for the first refresh.
    pub fn refresh_on_start(mut self, enabled: bool) -> Self {
        self.refresh_on_start = enabled;
        self
    }

    /// Seeds the store; the first successful refresh replaces it.
    pub fn initial(mut self, entries: HashMap<K, V>) -> Self {
        self.initial = entries;
        self
    }

    /// Names the refresh thread; also used as the log prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Builds the map, returning an error on invalid configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the interval is zero or no fetch callback
    /// was set.
    pub fn try_build(self) -> Result<PeriodicMap<K, V>, ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::new(
                "refresh interval must be greater than zero",
            ));
        }
        let Some(fetch) = self.fetch else {
            return Err(ConfigError::new("a fetch callback is required"));
        };
        Ok(PeriodicMap::from_settings(Settings {
            interval: self.interval,
            fetch,
            listener: self.listener,
            refresh_on_start: self.refresh_on_start,
            initial: self.initial,
            thread_name: self.thread_name,
        }))
    }

    /// Builds the map.
    ///
    /// # Panics
    ///
    /// Panics on invalid configuration. See [`try_build`](Self::try_build).
    pub fn build(self) -> PeriodicMap<K, V> {
        match self.try_build() {
            Ok(map) => map,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<K, V> fmt::Debug for PeriodicMapBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicMapBuilder")
            .field("interval", &self.interval)
            .field("has_fetch", &self.fetch.is_some())
            .field("has_listener", &self.listener.is_some())
            .field("refresh_on_start", &self.refresh_on_start)
            .field("initial_len", &self.initial.len())
            .field("thread_name", &self.thread_name)
            .finish()
    }
}
