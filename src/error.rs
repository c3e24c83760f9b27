//! Error types for the wheels library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when map configuration parameters are invalid
//!   (e.g. zero refresh interval, missing fetch callback).
//! - [`RefreshError`]: Produced when a refresh step fails, either because the
//!   fetch callback panicked or because a fallible fetch returned `Err`.
//!
//! Neither type is ever returned from `put`/`get`/`remove`/`start`/`stop`;
//! refresh failures are logged and reported through listeners and
//! [`PeriodicMap::refresh_now`](crate::map::periodic::PeriodicMap::refresh_now).
//!
//! ## Example Usage
//!
//! ```
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! use wheels::error::ConfigError;
//! use wheels::map::periodic::PeriodicMap;
//!
//! let bad: Result<PeriodicMap<u32, u32>, ConfigError> =
//!     PeriodicMap::try_new(Duration::ZERO, HashMap::new);
//! assert!(bad.is_err());
//! ```

use std::any::Any;
use std::error::Error;
use std::fmt;

/// Boxed error produced by a fallible fetch callback.
pub type FetchError = Box<dyn Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when map configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`PeriodicMap::try_new`](crate::map::periodic::PeriodicMap::try_new) and
/// [`PeriodicMapBuilder::try_build`](crate::builder::PeriodicMapBuilder::try_build).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for ConfigError {}

// ---------------------------------------------------------------------------
// RefreshError
// ---------------------------------------------------------------------------

/// Failure of a single refresh step. The backing store is left unchanged.
#[derive(Debug)]
pub enum RefreshError {
    /// The fetch callback panicked; carries the panic message when it was a
    /// string payload.
    ///
    /// No stack trace is captured here. The process panic hook has already
    /// reported the panic location, and the backtrace when `RUST_BACKTRACE`
    /// is set, before the payload reaches this type.
    Panicked(String),
    /// A fallible fetch callback returned an error.
    Fetch(FetchError),
}

impl RefreshError {
    /// Builds a [`RefreshError::Panicked`] from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(msg)
    }

    /// Returns `true` if the fetch callback panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked(msg) => write!(f, "fetch panicked: {}", msg),
            Self::Fetch(err) => write!(f, "fetch failed: {}", err),
        }
    }
}

impl Error for RefreshError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Panicked(_) => None,
            Self::Fetch(err) => Some(err.as_ref()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("interval must be > 0");
        assert_eq!(err.to_string(), "interval must be > 0");
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("test");
        assert_eq!(err.message(), "test");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }

    // -- RefreshError -----------------------------------------------------

    #[test]
    fn refresh_from_static_str_panic() {
        let payload = std::panic::catch_unwind(|| -> u32 { panic!("boom") }).unwrap_err();
        let err = RefreshError::from_panic(payload);
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "fetch panicked: boom");
    }

    #[test]
    fn refresh_from_formatted_panic() {
        let n = 2;
        let payload =
            std::panic::catch_unwind(|| -> u32 { panic!("call {} failed", n) }).unwrap_err();
        let err = RefreshError::from_panic(payload);
        assert_eq!(err.to_string(), "fetch panicked: call 2 failed");
    }

    #[test]
    fn refresh_from_opaque_panic() {
        let payload: Box<dyn Any + Send> = Box::new(17u32);
        let err = RefreshError::from_panic(payload);
        assert_eq!(err.to_string(), "fetch panicked: non-string panic payload");
    }

    #[test]
    fn refresh_fetch_exposes_source() {
        let err = RefreshError::Fetch(ConfigError::new("upstream down").into());
        assert!(!err.is_panic());
        assert_eq!(err.to_string(), "fetch failed: upstream down");
        assert_eq!(err.source().unwrap().to_string(), "upstream down");
    }

    #[test]
    fn refresh_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync>() {}
        assert_error::<RefreshError>();
    }
}
