//! A searchable cache of historical series, keyed by symbol and interval.
//!
//! Cached data never expires, so a cache should only live as long as one batch
//! of analysis requests.
//!
//! Finer intervals over longer periods can always be reduced to coarser
//! intervals over shorter periods, but never the reverse. Daily data over two
//! years can answer a weekly one-year request, but weekly data cannot answer a
//! daily request. Because of this the cache keeps, per interval, only the entry
//! with the longest period it has seen. A put with a shorter period than the
//! stored one is ignored.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::clock::Clock;
use super::error::Result;
use super::resample::resample;
use super::series::CanonicalSeries;
use super::timestring::TimeToken;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub interval: TimeToken,
    pub period: TimeToken,
    pub series: Arc<CanonicalSeries>,
    /// Clock time when the entry was admitted. Periods are still evaluated
    /// against the time of each lookup, not this.
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: HashMap<String, HashMap<String, CacheEntry>>,
    clock: Clock,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Stores `series` if it extends what the cache can compute for this
    /// symbol and interval. Returns whether the series was admitted.
    ///
    /// An absent symbol and interval is always stored. Replacing an entry
    /// compares periods, which fails if either is outside the vocabulary.
    pub fn put(
        &mut self,
        symbol: &str,
        interval: &TimeToken,
        period: &TimeToken,
        series: Arc<CanonicalSeries>,
    ) -> Result<bool> {
        let intervals = self.entries.entry(symbol.to_string()).or_default();
        if let Some(existing) = intervals.get(interval.as_str()) {
            if period.try_cmp(&existing.period)?.is_lt() {
                debug!(
                    symbol,
                    %interval,
                    %period,
                    cached_period = %existing.period,
                    "Cache PUT ignored"
                );
                return Ok(false);
            }
        }

        debug!(symbol, %interval, %period, rows = series.len(), "Cache PUT");
        intervals.insert(
            interval.as_str().to_string(),
            CacheEntry {
                interval: interval.clone(),
                period: period.clone(),
                series,
                stored_at: self.clock.now(),
            },
        );
        Ok(true)
    }

    /// Returns the symbol's series for this interval and period, computing it
    /// from other cached data when needed. `None` if it cannot be computed.
    ///
    /// Computed results are offered back to [`put`](Self::put).
    pub fn get(
        &mut self,
        symbol: &str,
        interval: &TimeToken,
        period: &TimeToken,
    ) -> Result<Option<Arc<CanonicalSeries>>> {
        let Some(source) = self.find_source(symbol, interval, period)? else {
            debug!(symbol, %interval, %period, "Cache MISS");
            return Ok(None);
        };

        if source.interval == *interval && source.period == *period {
            debug!(symbol, %interval, %period, "Cache HIT");
            return Ok(Some(source.series));
        }

        let computed = Arc::new(resample(&source.series, interval, period, self.clock.now())?);
        debug!(
            symbol,
            %interval,
            %period,
            from_interval = %source.interval,
            from_period = %source.period,
            "Cache DERIVED"
        );
        self.put(symbol, interval, period, Arc::clone(&computed))?;
        Ok(Some(computed))
    }

    /// Finds the entry to compute the request from: the finest cached interval
    /// that is no coarser than `interval` and covers at least `period`.
    fn find_source(
        &self,
        symbol: &str,
        interval: &TimeToken,
        period: &TimeToken,
    ) -> Result<Option<CacheEntry>> {
        let Some(intervals) = self.entries.get(symbol) else {
            return Ok(None);
        };
        let wanted_interval = interval.rank()?;
        let wanted_period = period.rank()?;

        // Ranking a stored token outside the vocabulary fails like any other comparison
        let mut candidates = Vec::with_capacity(intervals.len());
        for entry in intervals.values() {
            candidates.push((entry.interval.rank()?, entry));
        }
        candidates.sort_by_key(|(rank, _)| *rank);

        for (rank, entry) in candidates {
            // Anything from here on is coarser than requested
            if rank > wanted_interval {
                return Ok(None);
            }
            if entry.period.rank()? < wanted_period {
                continue;
            }
            return Ok(Some(entry.clone()));
        }
        Ok(None)
    }

    pub fn entry(&self, symbol: &str, interval: &TimeToken) -> Option<&CacheEntry> {
        self.entries.get(symbol)?.get(interval.as_str())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of cached (symbol, interval) entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn entries(&self) -> &HashMap<String, HashMap<String, CacheEntry>> {
        &self.entries
    }
}
