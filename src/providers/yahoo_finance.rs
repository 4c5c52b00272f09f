use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::RetryPolicy;
use crate::core::config::AppConfig;
use crate::core::{DataSource, SourceAdapter, SourceError, SourceOptions, TimeToken};

pub const LABEL: &str = "yfinance";

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
    events: Option<ChartEvents>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct ChartEvents {
    dividends: Option<HashMap<String, DividendEvent>>,
}

#[derive(Deserialize, Debug)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

/// Opening prices and dividends from one chart response, sorted by time.
#[derive(Debug, Clone)]
pub struct YahooChartAdapter {
    timestamps: Vec<DateTime<Utc>>,
    opens: Vec<f64>,
    dividends: Vec<f64>,
}

impl YahooChartAdapter {
    fn from_item(symbol: &str, item: ChartItem) -> Result<Self, SourceError> {
        let malformed = |message: String| SourceError::Malformed {
            symbol: symbol.to_string(),
            message,
        };

        let timestamps = item.timestamp.unwrap_or_default();
        let dividend_events = item
            .events
            .and_then(|events| events.dividends)
            .unwrap_or_default();
        if timestamps.is_empty() && dividend_events.is_empty() {
            return Err(SourceError::NoData {
                symbol: symbol.to_string(),
            });
        }

        let opens = item
            .indicators
            .and_then(|inds| inds.quote.into_iter().next())
            .and_then(|q| q.open)
            .unwrap_or_else(|| vec![None; timestamps.len()]);
        if opens.len() != timestamps.len() {
            return Err(malformed(format!(
                "{} opening prices for {} timestamps",
                opens.len(),
                timestamps.len()
            )));
        }

        let mut rows: Vec<(i64, f64, f64)> = timestamps
            .iter()
            .zip(opens)
            .map(|(ts, open)| (*ts, open.unwrap_or(f64::NAN), 0.0))
            .collect();

        // Dividends land on their bar, or on a price-less row of their own
        let index: HashMap<i64, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, (ts, _, _))| (*ts, i))
            .collect();
        for event in dividend_events.into_values() {
            match index.get(&event.date) {
                Some(&i) => rows[i].2 += event.amount,
                None => rows.push((event.date, f64::NAN, event.amount)),
            }
        }
        rows.sort_by_key(|(ts, _, _)| *ts);

        let mut adapter = YahooChartAdapter {
            timestamps: Vec::with_capacity(rows.len()),
            opens: Vec::with_capacity(rows.len()),
            dividends: Vec::with_capacity(rows.len()),
        };
        for (ts, open, dividend) in rows {
            let timestamp = DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| malformed(format!("timestamp {ts} out of range")))?;
            adapter.timestamps.push(timestamp);
            adapter.opens.push(open);
            adapter.dividends.push(dividend);
        }
        Ok(adapter)
    }
}

impl SourceAdapter for YahooChartAdapter {
    fn opening_prices(&self) -> &[f64] {
        &self.opens
    }

    fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    fn dividends(&self) -> Cow<'_, [f64]> {
        Cow::Borrowed(&self.dividends)
    }
}

/// Historical prices from the Yahoo Finance chart API.
pub struct YahooFinanceSource {
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl YahooFinanceSource {
    pub fn new(base_url: &str) -> Self {
        YahooFinanceSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let provider = &config.providers.yfinance;
        Self::new(&provider.base_url)
            .with_timeout(provider.timeout())
            .with_retry(RetryPolicy::from(&config.retry))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn chart_url(
        &self,
        symbol: &str,
        interval: &TimeToken,
        period: &TimeToken,
        options: &SourceOptions,
    ) -> Result<Url, SourceError> {
        let base = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let params = [
            ("interval", interval.as_str()),
            ("range", period.as_str()),
            ("events", "div"),
        ];
        Url::parse_with_params(&base, params.into_iter().chain(options.iter())).map_err(|e| {
            SourceError::Transport {
                symbol: symbol.to_string(),
                message: format!("invalid URL {base}: {e}"),
            }
        })
    }

    fn request(&self, symbol: &str, url: &Url) -> Result<String, SourceError> {
        let transport = |e: reqwest::Error| SourceError::Transport {
            symbol: symbol.to_string(),
            message: e.to_string(),
        };

        let client = reqwest::blocking::Client::builder()
            .user_agent("sharpe/1.0")
            .timeout(self.timeout)
            .build()
            .map_err(transport)?;
        let response = client.get(url.clone()).send().map_err(transport)?;
        debug!(status = %response.status(), "Received Yahoo response");

        if !response.status().is_success() {
            return Err(SourceError::Status {
                symbol: symbol.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.text().map_err(transport)
    }
}

impl DataSource for YahooFinanceSource {
    fn label(&self) -> &'static str {
        LABEL
    }

    #[instrument(
        name = "YahooChartFetch",
        skip(self, options),
        fields(symbol = %symbol, interval = %interval, period = %period)
    )]
    fn get_from_source(
        &self,
        symbol: &str,
        interval: &TimeToken,
        period: &TimeToken,
        options: &SourceOptions,
    ) -> Result<Box<dyn SourceAdapter>, SourceError> {
        let url = self.chart_url(symbol, interval, period, options)?;
        debug!("Requesting chart data from {}", url);

        let text = self.retry.run_if(
            "yahoo_chart",
            || self.request(symbol, &url),
            SourceError::is_transient,
        )?;

        let data: YahooChartResponse =
            serde_json::from_str(&text).map_err(|e| SourceError::Malformed {
                symbol: symbol.to_string(),
                message: e.to_string(),
            })?;
        let item = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| SourceError::NoData {
                symbol: symbol.to_string(),
            })?;

        let adapter = YahooChartAdapter::from_item(symbol, item)?;
        debug!(rows = adapter.timestamps.len(), "Parsed chart data");
        Ok(Box::new(adapter))
    }
}
