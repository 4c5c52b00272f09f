//! Cache-aware retrieval of canonical series from a data source

use std::sync::Arc;
use tracing::{debug, info};

use super::cache::SeriesCache;
use super::clock::Clock;
use super::error::Result;
use super::resample::resample;
use super::series::CanonicalSeries;
use super::source::{DataSource, SourceOptions};
use super::timestring::TimeToken;

pub const DEFAULT_INTERVAL: &str = "1d";
pub const DEFAULT_PERIOD: &str = "5y";

/// Fetches series from one [`DataSource`], answering repeat and narrower
/// requests from its own cache.
pub struct Getter {
    source: Box<dyn DataSource>,
    cache: SeriesCache,
}

impl Getter {
    pub fn new(source: Box<dyn DataSource>) -> Self {
        Self::with_cache(source, SeriesCache::new())
    }

    pub fn with_clock(source: Box<dyn DataSource>, clock: Clock) -> Self {
        Self::with_cache(source, SeriesCache::with_clock(clock))
    }

    pub fn with_cache(source: Box<dyn DataSource>, cache: SeriesCache) -> Self {
        Self { source, cache }
    }

    pub fn label(&self) -> &'static str {
        self.source.label()
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// Returns `symbol`'s series at `interval` covering `period` back from now.
    pub fn get_data(
        &mut self,
        symbol: &str,
        interval: &str,
        period: &str,
    ) -> Result<Arc<CanonicalSeries>> {
        self.get_data_with(symbol, interval, period, &SourceOptions::default())
    }

    /// [`get_data`](Self::get_data) with the default daily interval over five years.
    pub fn get_default(&mut self, symbol: &str) -> Result<Arc<CanonicalSeries>> {
        self.get_data(symbol, DEFAULT_INTERVAL, DEFAULT_PERIOD)
    }

    /// Like [`get_data`](Self::get_data), passing `options` to the source on a miss.
    pub fn get_data_with(
        &mut self,
        symbol: &str,
        interval: &str,
        period: &str,
        options: &SourceOptions,
    ) -> Result<Arc<CanonicalSeries>> {
        let interval = TimeToken::parse(interval)?;
        let period = TimeToken::parse(period)?;

        if let Some(series) = self.cache.get(symbol, &interval, &period)? {
            return Ok(series);
        }

        info!(
            source = self.source.label(),
            symbol,
            %interval,
            %period,
            "Fetching from source"
        );
        let adapter = self
            .source
            .get_from_source(symbol, &interval, &period, options)?;
        let raw = CanonicalSeries::from_adapter(adapter.as_ref())?;

        // Sources may return a different granularity or a longer window than asked
        let series = Arc::new(resample(&raw, &interval, &period, self.cache.clock().now())?);
        debug!(symbol, raw = raw.len(), rows = series.len(), "Normalized source data");

        self.cache
            .put(symbol, &interval, &period, Arc::clone(&series))?;
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{Error, SourceError, TimeTokenError};
    use crate::core::fixtures::{daily_adapter, fixture_now};
    use crate::core::source::SourceAdapter;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockSource {
        calls: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<(String, String, String, SourceOptions)>>>,
        fail: bool,
    }

    impl DataSource for MockSource {
        fn label(&self) -> &'static str {
            "mock"
        }

        fn get_from_source(
            &self,
            symbol: &str,
            interval: &TimeToken,
            period: &TimeToken,
            options: &SourceOptions,
        ) -> std::result::Result<Box<dyn SourceAdapter>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push((
                symbol.to_string(),
                interval.to_string(),
                period.to_string(),
                options.clone(),
            ));
            if self.fail {
                return Err(SourceError::NoData {
                    symbol: symbol.to_string(),
                });
            }
            Ok(Box::new(daily_adapter()))
        }
    }

    fn getter() -> (Getter, Arc<AtomicUsize>, Arc<Mutex<Vec<(String, String, String, SourceOptions)>>>) {
        let source = MockSource::default();
        let calls = Arc::clone(&source.calls);
        let requests = Arc::clone(&source.requests);
        (
            Getter::with_clock(Box::new(source), Clock::Fixed(fixture_now())),
            calls,
            requests,
        )
    }

    #[test]
    fn test_miss_fetches_and_caches() {
        let (mut getter, calls, requests) = getter();

        let first = getter.get_data("IBM", "1d", "1y").unwrap();
        assert_eq!(first.len(), 364);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            requests.lock().unwrap()[0],
            ("IBM".to_string(), "1d".to_string(), "1y".to_string(), SourceOptions::default())
        );

        let second = getter.get_data("IBM", "1d", "1y").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_narrower_request_is_computed_from_cache() {
        let (mut getter, calls, _) = getter();

        let daily = getter.get_data("IBM", "1d", "1y").unwrap();
        let monthly = getter.get_data("IBM", "1mo", "6mo").unwrap();
        assert!(!Arc::ptr_eq(&daily, &monthly));
        assert_eq!(monthly.len(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_broader_request_goes_to_source() {
        let (mut getter, calls, requests) = getter();

        getter.get_data("IBM", "1d", "1y").unwrap();
        getter.get_data("IBM", "1mo", "2y").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(requests.lock().unwrap()[1].2, "2y");
    }

    #[test]
    fn test_source_result_is_normalized_before_caching() {
        let (mut getter, _, _) = getter();

        // Source returns daily rows for a weekly request
        let weekly = getter.get_data("IBM", "1wk", "6mo").unwrap();
        assert_eq!(weekly.len(), 26);
        let entry = getter
            .cache()
            .entry("IBM", &TimeToken::parse("1wk").unwrap())
            .unwrap();
        assert!(Arc::ptr_eq(&entry.series, &weekly));
        assert_eq!(getter.cache().len(), 1);
    }

    #[test]
    fn test_options_reach_the_source() {
        let (mut getter, _, requests) = getter();
        let options = SourceOptions::new().with("includePrePost", "true");

        getter.get_data_with("IBM", "1d", "1y", &options).unwrap();
        assert_eq!(requests.lock().unwrap()[0].3, options);
    }

    #[test]
    fn test_defaults() {
        let (mut getter, _, requests) = getter();

        getter.get_default("IBM").unwrap();
        let request = &requests.lock().unwrap()[0];
        assert_eq!(request.1, DEFAULT_INTERVAL);
        assert_eq!(request.2, DEFAULT_PERIOD);
    }

    #[test]
    fn test_malformed_token_does_not_reach_source() {
        let (mut getter, calls, _) = getter();

        let err = getter.get_data("IBM", "1 day", "1y").unwrap_err();
        assert!(matches!(err, Error::Token(TimeTokenError::Parse { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_token_outside_vocabulary_for_new_symbol_is_fetched() {
        let (mut getter, calls, _) = getter();

        let series = getter.get_data("IBM", "1d", "4mo").unwrap();
        assert!(!series.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(getter.cache().entry("IBM", &TimeToken::parse("1d").unwrap()).is_some());

        // Once the symbol is cached the lookup has to rank the period
        let err = getter.get_data("IBM", "1d", "4mo").unwrap_err();
        assert!(matches!(err, Error::Token(TimeTokenError::NotInVocabulary { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_source_errors_propagate_and_are_not_cached() {
        let source = MockSource {
            fail: true,
            ..MockSource::default()
        };
        let calls = Arc::clone(&source.calls);
        let mut getter = Getter::with_clock(Box::new(source), Clock::Fixed(fixture_now()));

        let err = getter.get_data("IBM", "1d", "1y").unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::NoData { .. })));
        assert!(getter.get_data("IBM", "1d", "1y").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(getter.cache().is_empty());
        assert_eq!(getter.label(), "mock");
    }
}
