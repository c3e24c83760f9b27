pub use crate::builder::PeriodicMapBuilder;
pub use crate::error::{ConfigError, FetchError, RefreshError};
pub use crate::listener::{RefreshEvent, RefreshListener};
pub use crate::map::concurrent::ConcurrentMap;
pub use crate::map::periodic::PeriodicMap;
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::PeriodicMapMetricsSnapshot;
#[cfg(feature = "metrics")]
pub use crate::metrics::traits::{MetricsExporter, MetricsReset, MetricsSnapshotProvider};
pub use crate::traits::{ConcurrentMapRead, ConcurrentMapWrite};
