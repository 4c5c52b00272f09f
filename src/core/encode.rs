//! JSON encoding of series, tokens and cache contents for diagnostics.
//!
//! Encoded values carry a `__type__` tag so a dump can be read back without
//! knowing its shape in advance.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::fmt::{Display, Formatter};

use super::cache::SeriesCache;
use super::series::CanonicalSeries;
use super::timestring::TimeToken;

pub const TYPE_TAG: &str = "__type__";

const SERIES_TYPE: &str = "CanonicalSeries";
const TOKEN_TYPE: &str = "TimeToken";

#[derive(Serialize, Deserialize)]
struct EncodedSeries {
    #[serde(rename = "__type__")]
    type_tag: String,
    timestamp: Vec<DateTime<Utc>>,
    /// Missing prices are encoded as `null`.
    price: Vec<Option<f64>>,
    dividend: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct EncodedToken {
    #[serde(rename = "__type__")]
    type_tag: String,
    time_string: String,
}

fn check_tag<E: serde::de::Error>(found: &str, expected: &str) -> Result<(), E> {
    if found == expected {
        Ok(())
    } else {
        Err(E::custom(format!("expected {TYPE_TAG} '{expected}', found '{found}'")))
    }
}

impl Serialize for CanonicalSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EncodedSeries {
            type_tag: SERIES_TYPE.to_string(),
            timestamp: self.timestamps().collect(),
            price: self
                .prices()
                .map(|p| if p.is_nan() { None } else { Some(p) })
                .collect(),
            dividend: self.dividends().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CanonicalSeries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = EncodedSeries::deserialize(deserializer)?;
        check_tag(&encoded.type_tag, SERIES_TYPE)?;
        let prices: Vec<f64> = encoded
            .price
            .into_iter()
            .map(|p| p.unwrap_or(f64::NAN))
            .collect();
        CanonicalSeries::from_columns(&encoded.timestamp, &prices, &encoded.dividend)
            .map_err(D::Error::custom)
    }
}

impl Serialize for TimeToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EncodedToken {
            type_tag: TOKEN_TYPE.to_string(),
            time_string: self.as_str().to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = EncodedToken::deserialize(deserializer)?;
        check_tag(&encoded.type_tag, TOKEN_TYPE)?;
        TimeToken::parse(&encoded.time_string).map_err(D::Error::custom)
    }
}

impl SeriesCache {
    /// Dumps the cache as `{symbol: {interval: {period, stored_at, data}}}`.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let mut symbols = Map::new();
        for (symbol, intervals) in self.entries() {
            let mut by_interval = Map::new();
            for (interval, entry) in intervals {
                by_interval.insert(
                    interval.clone(),
                    json!({
                        "period": serde_json::to_value(&entry.period)?,
                        "stored_at": entry.stored_at,
                        "data": serde_json::to_value(entry.series.as_ref())?,
                    }),
                );
            }
            symbols.insert(symbol.clone(), Value::Object(by_interval));
        }
        Ok(Value::Object(symbols))
    }
}

impl Display for SeriesCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let value = self.to_json().map_err(|_| std::fmt::Error)?;
        write!(f, "{value}")
    }
}
