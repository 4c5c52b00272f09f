//! Data source contracts

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::BTreeMap;

use super::error::SourceError;
use super::timestring::TimeToken;

/// Normalized view over one provider's raw fetch result.
///
/// All three columns are aligned: index `i` of each refers to the same row.
pub trait SourceAdapter: Send {
    fn opening_prices(&self) -> &[f64];

    fn timestamps(&self) -> &[DateTime<Utc>];

    /// Dividends paid at each timestamp. Zero-filled when the source reports none.
    fn dividends(&self) -> Cow<'_, [f64]>;
}

/// Extra provider-specific request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOptions {
    params: BTreeMap<String, String>,
}

impl SourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// A provider of raw historical price data.
pub trait DataSource: Send + Sync {
    /// Short name used to select this source, e.g. `yfinance`.
    fn label(&self) -> &'static str;

    fn get_from_source(
        &self,
        symbol: &str,
        interval: &TimeToken,
        period: &TimeToken,
        options: &SourceOptions,
    ) -> Result<Box<dyn SourceAdapter>, SourceError>;
}

/// In-memory adapter over already-aligned columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnAdapter {
    timestamps: Vec<DateTime<Utc>>,
    prices: Vec<f64>,
    dividends: Option<Vec<f64>>,
}

impl ColumnAdapter {
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        prices: Vec<f64>,
        dividends: Option<Vec<f64>>,
    ) -> Self {
        Self {
            timestamps,
            prices,
            dividends,
        }
    }
}

impl SourceAdapter for ColumnAdapter {
    fn opening_prices(&self) -> &[f64] {
        &self.prices
    }

    fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    fn dividends(&self) -> Cow<'_, [f64]> {
        match &self.dividends {
            Some(dividends) => Cow::Borrowed(dividends),
            None => Cow::Owned(vec![0.0; self.timestamps.len()]),
        }
    }
}
