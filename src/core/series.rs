//! Canonical price and dividend time series

use chrono::{DateTime, Utc};

use super::error::SourceError;
use super::source::SourceAdapter;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesRow {
    pub timestamp: DateTime<Utc>,
    /// Opening price. NaN when the source had no price for this timestamp.
    pub price: f64,
    pub dividend: f64,
}

/// A time-indexed sequence of rows with strictly increasing timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalSeries {
    rows: Vec<SeriesRow>,
}

impl CanonicalSeries {
    /// Sorts rows and merges duplicate timestamps (mean price, summed dividends).
    pub fn new(mut rows: Vec<SeriesRow>) -> Self {
        rows.sort_by_key(|row| row.timestamp);

        let mut merged: Vec<SeriesRow> = Vec::with_capacity(rows.len());
        let mut prices: Vec<f64> = Vec::new();
        for row in rows {
            match merged.last_mut() {
                Some(last) if last.timestamp == row.timestamp => {
                    prices.push(row.price);
                    last.price = nan_mean(&prices);
                    last.dividend += row.dividend;
                }
                _ => {
                    prices.clear();
                    prices.push(row.price);
                    merged.push(row);
                }
            }
        }

        Self { rows: merged }
    }

    /// Builds a series from aligned columns.
    pub fn from_columns(
        timestamps: &[DateTime<Utc>],
        prices: &[f64],
        dividends: &[f64],
    ) -> Result<Self, SourceError> {
        if timestamps.len() != prices.len() || timestamps.len() != dividends.len() {
            return Err(SourceError::Misaligned {
                timestamps: timestamps.len(),
                prices: prices.len(),
                dividends: dividends.len(),
            });
        }

        let rows = timestamps
            .iter()
            .zip(prices)
            .zip(dividends.iter())
            .map(|((timestamp, price), dividend)| SeriesRow {
                timestamp: *timestamp,
                price: *price,
                dividend: *dividend,
            })
            .collect();
        Ok(Self::new(rows))
    }

    pub fn from_adapter(adapter: &dyn SourceAdapter) -> Result<Self, SourceError> {
        Self::from_columns(
            adapter.timestamps(),
            adapter.opening_prices(),
            &adapter.dividends(),
        )
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&SeriesRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&SeriesRow> {
        self.rows.last()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.rows.iter().map(|row| row.timestamp)
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|row| row.price)
    }

    pub fn dividends(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|row| row.dividend)
    }

    pub(crate) fn from_sorted_rows(rows: Vec<SeriesRow>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self { rows }
    }
}

/// Mean of the non-NaN values, or NaN if there are none.
pub(crate) fn nan_mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}
