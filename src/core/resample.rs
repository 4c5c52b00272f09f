//! Interval resampling and period truncation.
//!
//! Rows are grouped into calendar buckets of the target interval. Each bucket
//! becomes one row labeled by the bucket start, with the mean of its prices and
//! the sum of its dividends. Buckets starting at or before the period cutoff are
//! dropped. Empty buckets are not emitted.
//!
//! Bucket boundaries (all UTC):
//! - minutes, hours, days: floor of the Unix timestamp to a multiple of the count
//! - weeks: Monday 00:00, counted in multiples from Monday 1969-12-29
//! - months: the 1st at 00:00, counted in multiples from January of year 0
//! - years: January 1st, at years divisible by the count

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::debug;

use super::error::TimeTokenError;
use super::series::{CanonicalSeries, SeriesRow, nan_mean};
use super::timestring::{TimeToken, TimeUnit};

const MINUTE: i64 = 60;
const HOUR: i64 = 3_600;
const DAY: i64 = 86_400;

/// Resamples `series` to `interval` and keeps only rows newer than `period` before `now`.
pub fn resample(
    series: &CanonicalSeries,
    interval: &TimeToken,
    period: &TimeToken,
    now: DateTime<Utc>,
) -> Result<CanonicalSeries, TimeTokenError> {
    let rule = interval.offset_alias(true)?;
    let cutoff = period.period_start(now)?;

    if series.is_empty() {
        return Ok(CanonicalSeries::default());
    }

    let unit = interval.unit();
    let count = i64::from(interval.count());
    let rows = group_by_bucket(series.rows(), |ts| bucket_start(ts, unit, count))
        .into_iter()
        .filter(|row| row.timestamp > cutoff)
        .collect::<Vec<_>>();

    debug!(
        rule = %rule,
        %cutoff,
        input = series.len(),
        output = rows.len(),
        "Resampled series"
    );
    Ok(CanonicalSeries::from_sorted_rows(rows))
}

fn group_by_bucket<F>(rows: &[SeriesRow], bucket_of: F) -> Vec<SeriesRow>
where
    F: Fn(DateTime<Utc>) -> Option<DateTime<Utc>>,
{
    let mut out: Vec<SeriesRow> = Vec::new();
    let mut prices: Vec<f64> = Vec::new();
    let mut current: Option<SeriesRow> = None;

    for row in rows {
        let Some(bucket) = bucket_of(row.timestamp) else {
            continue;
        };
        match current.as_mut() {
            Some(agg) if agg.timestamp == bucket => {
                prices.push(row.price);
                agg.dividend += row.dividend;
            }
            _ => {
                if let Some(mut done) = current.take() {
                    done.price = nan_mean(&prices);
                    out.push(done);
                }
                prices.clear();
                prices.push(row.price);
                current = Some(SeriesRow {
                    timestamp: bucket,
                    price: row.price,
                    dividend: row.dividend,
                });
            }
        }
    }

    if let Some(mut done) = current {
        done.price = nan_mean(&prices);
        out.push(done);
    }
    out
}

fn bucket_start(ts: DateTime<Utc>, unit: TimeUnit, count: i64) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Minute => floor_seconds(ts, MINUTE * count),
        TimeUnit::Hour => floor_seconds(ts, HOUR * count),
        TimeUnit::Day => floor_seconds(ts, DAY * count),
        TimeUnit::Week => {
            // 1970-01-01 is a Thursday, so Monday 1969-12-29 is day -3
            let day = ts.timestamp().div_euclid(DAY);
            let week = (day + 3).div_euclid(7);
            let start_week = week.div_euclid(count) * count;
            DateTime::from_timestamp((start_week * 7 - 3) * DAY, 0)
        }
        TimeUnit::Month => {
            let months = i64::from(ts.year()) * 12 + i64::from(ts.month0());
            let start = months.div_euclid(count) * count;
            let year = i32::try_from(start.div_euclid(12)).ok()?;
            let month = u32::try_from(start.rem_euclid(12)).ok()? + 1;
            midnight(NaiveDate::from_ymd_opt(year, month, 1)?)
        }
        TimeUnit::Year => {
            let year = i64::from(ts.year()).div_euclid(count) * count;
            midnight(NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, 1, 1)?)
        }
        TimeUnit::Quarter => None,
    }
}

fn floor_seconds(ts: DateTime<Utc>, width: i64) -> Option<DateTime<Utc>> {
    let secs = ts.timestamp().div_euclid(width) * width;
    DateTime::from_timestamp(secs, 0)
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}
