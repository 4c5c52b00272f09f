//! Core data acquisition abstractions

pub mod cache;
pub mod clock;
pub mod config;
pub mod encode;
pub mod error;
pub mod getter;
pub mod log;
pub mod resample;
pub mod series;
pub mod source;
pub mod timestring;

// Re-export main types for cleaner imports
pub use cache::{CacheEntry, SeriesCache};
pub use clock::Clock;
pub use error::{Error, Result, SourceError, TimeTokenError};
pub use getter::{DEFAULT_INTERVAL, DEFAULT_PERIOD, Getter};
pub use resample::resample;
pub use series::{CanonicalSeries, SeriesRow};
pub use source::{ColumnAdapter, DataSource, SourceAdapter, SourceOptions};
pub use timestring::{TimeToken, TimeUnit, VOCABULARY};
