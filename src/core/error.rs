//! Error taxonomy for token handling, sources and provider lookup

use thiserror::Error;

/// Failures raised by [`TimeToken`](crate::core::TimeToken) parsing, conversion and ordering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeTokenError {
    #[error("unable to parse time token from '{value}', expected <count><unit> such as 1d, 1wk or 6mo")]
    Parse { value: String },

    #[error("time token '{token}' uses a unit not supported by {operation}")]
    UnsupportedUnit {
        token: String,
        operation: &'static str,
    },

    #[error("time token '{token}' is not in the supported vocabulary")]
    NotInVocabulary { token: String },

    #[error("time token '{token}' cannot be applied: date out of range")]
    OutOfRange { token: String },
}

/// Failures raised while fetching or normalizing data from a source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Request error: {message} for symbol: {symbol}")]
    Transport { symbol: String, message: String },

    #[error("HTTP error: {status} for symbol: {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("Failed to parse response for {symbol}: {message}")]
    Malformed { symbol: String, message: String },

    #[error("No price data found for symbol: {symbol}")]
    NoData { symbol: String },

    #[error(
        "source columns are misaligned: {timestamps} timestamps, {prices} prices, {dividends} dividends"
    )]
    Misaligned {
        timestamps: usize,
        prices: usize,
        dividends: usize,
    },
}

impl SourceError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Transport { .. } => true,
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Top-level error type for data acquisition.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Token(#[from] TimeTokenError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("'{label}' data source not in {known}")]
    UnknownProvider { label: String, known: String },
}

pub type Result<T> = std::result::Result<T, Error>;
