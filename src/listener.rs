//! Refresh notifications for [`PeriodicMap`](crate::map::periodic::PeriodicMap).
//!
//! A failing fetch never interrupts callers: the map keeps serving its last
//! good snapshot. Listeners are how an application notices that it is
//! serving stale data.
//!
//! ## Example Usage
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! use wheels::map::periodic::PeriodicMap;
//!
//! let failures = Arc::new(AtomicUsize::new(0));
//! let seen = failures.clone();
//!
//! let map: PeriodicMap<u32, u32> = PeriodicMap::builder(Duration::from_secs(30))
//!     .fetch(|| -> HashMap<u32, u32> { panic!("upstream unavailable") })
//!     .on_refresh(move |event| {
//!         if event.is_failure() {
//!             seen.fetch_add(1, Ordering::Relaxed);
//!         }
//!     })
//!     .build();
//!
//! assert!(map.refresh_now().is_err());
//! assert_eq!(failures.load(Ordering::Relaxed), 1);
//! ```

use std::time::Duration;

use crate::error::RefreshError;

/// Outcome of one refresh step.
#[derive(Debug)]
pub enum RefreshEvent<'a> {
    /// The store was replaced with a snapshot of `entries` entries.
    Completed { entries: usize, elapsed: Duration },
    /// The fetch failed; the store was left unchanged.
    Failed {
        error: &'a RefreshError,
        elapsed: Duration,
    },
}

impl RefreshEvent<'_> {
    /// Returns `true` for [`RefreshEvent::Failed`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Time spent inside the fetch callback. Waiting for the store's write
    /// lock is not included.
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Completed { elapsed, .. } | Self::Failed { elapsed, .. } => *elapsed,
        }
    }
}

/// Receives an event after every refresh step, once the store lock has been
/// released.
///
/// Called from the refresh thread, or from the caller of `refresh_now`.
/// A panic inside a listener is caught and logged; it never ends the refresh
/// loop.
pub trait RefreshListener: Send + Sync {
    fn on_refresh(&self, event: &RefreshEvent<'_>);
}

impl<F> RefreshListener for F
where
    F: Fn(&RefreshEvent<'_>) + Send + Sync,
{
    fn on_refresh(&self, event: &RefreshEvent<'_>) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_reported_for_both_variants() {
        let error = RefreshError::Panicked("x".into());
        let ok = RefreshEvent::Completed {
            entries: 1,
            elapsed: Duration::from_millis(3),
        };
        let failed = RefreshEvent::Failed {
            error: &error,
            elapsed: Duration::from_millis(5),
        };

        assert!(!ok.is_failure());
        assert!(failed.is_failure());
        assert_eq!(ok.elapsed(), Duration::from_millis(3));
        assert_eq!(failed.elapsed(), Duration::from_millis(5));
    }

    #[test]
    fn plain_functions_are_listeners() {
        fn assert_listener<L: RefreshListener>(_: &L) {}
        fn ignore(_: &RefreshEvent<'_>) {}
        assert_listener(&ignore);
    }
}
