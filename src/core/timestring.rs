//! Interval and period time strings such as `1d`, `1wk` and `6mo`

use chrono::{DateTime, Months, TimeDelta, Utc};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::error::TimeTokenError;

/// Supported time strings in ascending order. Ordering between tokens is the
/// position in this list, not the length of time they cover.
pub const VOCABULARY: [&str; 18] = [
    "1m", "2m", "5m", "15m", "30m", "60m", "1h", "90m", "1d", "5d", "1wk", "1mo", "3mo", "6mo",
    "1y", "2y", "5y", "10y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    pub const fn code(self) -> &'static str {
        match self {
            TimeUnit::Minute => "m",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
            TimeUnit::Week => "wk",
            TimeUnit::Month => "mo",
            TimeUnit::Quarter => "q",
            TimeUnit::Year => "y",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "m" => Some(TimeUnit::Minute),
            "h" => Some(TimeUnit::Hour),
            "d" => Some(TimeUnit::Day),
            "wk" => Some(TimeUnit::Week),
            "mo" => Some(TimeUnit::Month),
            "q" => Some(TimeUnit::Quarter),
            "y" => Some(TimeUnit::Year),
            _ => None,
        }
    }

    /// Resampling rule symbol, aligned with pandas offset aliases.
    fn offset_symbol(self) -> Option<&'static str> {
        match self {
            TimeUnit::Minute => Some("T"),
            TimeUnit::Hour => Some("H"),
            TimeUnit::Day => Some("D"),
            TimeUnit::Week => Some("W"),
            TimeUnit::Month => Some("M"),
            TimeUnit::Year => Some("Y"),
            TimeUnit::Quarter => None,
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Quarter => "quarter",
            TimeUnit::Year => "year",
        };
        f.write_str(name)
    }
}

/// A parsed interval or period such as `1d` or `6mo`.
///
/// The input string is kept verbatim, so `"01d".parse()` displays as `01d`
/// and is not equal to `1d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeToken {
    repr: String,
    unit: TimeUnit,
    count: u32,
}

impl TimeToken {
    pub fn parse(value: &str) -> Result<Self, TimeTokenError> {
        let parse_error = || TimeTokenError::Parse {
            value: value.to_string(),
        };

        let split = value
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(parse_error)?;
        let (digits, code) = value.split_at(split);

        if digits.is_empty()
            || code.is_empty()
            || code.len() > 2
            || !code.chars().all(|c| c.is_ascii_lowercase())
        {
            return Err(parse_error());
        }

        let count: u32 = digits.parse().map_err(|_| parse_error())?;
        if count == 0 {
            return Err(parse_error());
        }
        let unit = TimeUnit::from_code(code).ok_or_else(parse_error)?;

        Ok(Self {
            repr: value.to_string(),
            unit,
            count,
        })
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn as_str(&self) -> &str {
        &self.repr
    }

    /// All supported tokens in ascending order.
    pub fn vocabulary() -> impl Iterator<Item = TimeToken> {
        VOCABULARY.iter().filter_map(|s| TimeToken::parse(s).ok())
    }

    /// Converts the token to a resampling rule code, e.g. `3T` or `T` for `3m`.
    pub fn offset_alias(&self, prepend_count: bool) -> Result<String, TimeTokenError> {
        let symbol = self
            .unit
            .offset_symbol()
            .ok_or_else(|| TimeTokenError::UnsupportedUnit {
                token: self.repr.clone(),
                operation: "offset alias conversion",
            })?;
        Ok(if prepend_count {
            format!("{}{symbol}", self.count)
        } else {
            symbol.to_string()
        })
    }

    /// Returns the instant `count` units before `now`. Months and years are
    /// subtracted on the calendar, clamping to the end of shorter months.
    pub fn period_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeTokenError> {
        let count = i64::from(self.count);
        let start = match self.unit {
            TimeUnit::Minute => TimeDelta::try_minutes(count).and_then(|d| now.checked_sub_signed(d)),
            TimeUnit::Hour => TimeDelta::try_hours(count).and_then(|d| now.checked_sub_signed(d)),
            TimeUnit::Day => TimeDelta::try_days(count).and_then(|d| now.checked_sub_signed(d)),
            TimeUnit::Week => TimeDelta::try_weeks(count).and_then(|d| now.checked_sub_signed(d)),
            TimeUnit::Month => now.checked_sub_months(Months::new(self.count)),
            TimeUnit::Year => self
                .count
                .checked_mul(12)
                .and_then(|months| now.checked_sub_months(Months::new(months))),
            TimeUnit::Quarter => {
                return Err(TimeTokenError::UnsupportedUnit {
                    token: self.repr.clone(),
                    operation: "period start",
                });
            }
        };
        start.ok_or_else(|| TimeTokenError::OutOfRange {
            token: self.repr.clone(),
        })
    }

    /// Position of the token in [`VOCABULARY`].
    pub fn rank(&self) -> Result<usize, TimeTokenError> {
        VOCABULARY
            .iter()
            .position(|s| *s == self.repr)
            .ok_or_else(|| TimeTokenError::NotInVocabulary {
                token: self.repr.clone(),
            })
    }

    /// Compares by vocabulary position. Fails if either token is outside the vocabulary.
    pub fn try_cmp(&self, other: &TimeToken) -> Result<Ordering, TimeTokenError> {
        Ok(self.rank()?.cmp(&other.rank()?))
    }
}

impl PartialOrd for TimeToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl Display for TimeToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.repr)
    }
}

impl FromStr for TimeToken {
    type Err = TimeTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeToken::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tok(s: &str) -> TimeToken {
        TimeToken::parse(s).unwrap()
    }

    #[test]
    fn test_improper_format() {
        let cases = [
            "3m3", "t3", "3.03", "3", "3.03m", "-3", "-3m", "-3.03d", "3min", "30minute", "1Q",
            "", "0d", "1xx", "99999999999d",
        ];
        for case in cases {
            let err = TimeToken::parse(case).expect_err(case);
            assert!(matches!(err, TimeTokenError::Parse { .. }), "{case}");
        }
    }

    #[test]
    fn test_proper_format() {
        let cases = [
            ("1m", TimeUnit::Minute, 1),
            ("60m", TimeUnit::Minute, 60),
            ("5d", TimeUnit::Day, 5),
            ("1wk", TimeUnit::Week, 1),
            ("12mo", TimeUnit::Month, 12),
            ("2q", TimeUnit::Quarter, 2),
        ];
        for (arg, unit, count) in cases {
            let token = tok(arg);
            assert_eq!(token.unit(), unit);
            assert_eq!(token.count(), count);
        }
    }

    #[test]
    fn test_round_trip_preserves_string() {
        for s in VOCABULARY.iter().copied().chain(["01d", "12wk", "3q"]) {
            assert_eq!(tok(s).to_string(), s);
        }
        assert_ne!(tok("01d"), tok("1d"));
    }

    #[test]
    fn test_offset_alias_conversions() {
        let cases = [
            ("1m", "1T"),
            ("15m", "15T"),
            ("12h", "12H"),
            ("10d", "10D"),
            ("1wk", "1W"),
            ("12mo", "12M"),
            ("10y", "10Y"),
        ];
        for (arg, expected) in cases {
            assert_eq!(tok(arg).offset_alias(true).unwrap(), expected);
        }
        assert_eq!(tok("6mo").offset_alias(false).unwrap(), "M");
    }

    #[test]
    fn test_quarter_is_unsupported() {
        let quarter = tok("1q");
        assert!(matches!(
            quarter.offset_alias(true),
            Err(TimeTokenError::UnsupportedUnit { .. })
        ));
        assert!(matches!(
            quarter.period_start(Utc::now()),
            Err(TimeTokenError::UnsupportedUnit { .. })
        ));
        assert!(matches!(
            quarter.rank(),
            Err(TimeTokenError::NotInVocabulary { .. })
        ));
    }

    #[test]
    fn test_vocabulary_is_strict_total_order() {
        let tokens: Vec<TimeToken> = TimeToken::vocabulary().collect();
        assert_eq!(tokens.len(), VOCABULARY.len());
        for (i, a) in tokens.iter().enumerate() {
            for (j, b) in tokens.iter().enumerate() {
                assert_eq!(a.try_cmp(b).unwrap(), i.cmp(&j), "{a} vs {b}");
                for c in &tokens {
                    if a < b && b < c {
                        assert!(a < c, "{a} < {b} < {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_order_is_by_vocabulary_position() {
        assert!(tok("5d") < tok("1wk"));
        assert!(tok("1wk") < tok("1mo"));
        assert!(tok("60m") < tok("1h"));
        assert!(tok("1h") < tok("90m"));
        assert!(tok("10y") >= tok("5y"));
    }

    #[test]
    fn test_comparison_outside_vocabulary_fails() {
        let known = tok("1d");
        let unknown = tok("2wk");
        assert!(matches!(
            known.try_cmp(&unknown),
            Err(TimeTokenError::NotInVocabulary { ref token }) if token == "2wk"
        ));
        assert!(unknown.try_cmp(&known).is_err());
        assert_eq!(known.partial_cmp(&unknown), None);
        assert!(!(known < unknown) && !(known > unknown));
        // Equality never needs the vocabulary, ordering always does
        assert_ne!(known, unknown);
        assert_eq!(unknown, tok("2wk"));
        assert_eq!(unknown.partial_cmp(&tok("2wk")), None);
        assert!(!(unknown <= tok("2wk")));
        assert!(!(unknown >= tok("2wk")));
        assert_eq!(tok("1d").partial_cmp(&tok("1d")), Some(Ordering::Equal));
    }

    #[test]
    fn test_period_start_is_calendar_aware() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 15, 0, 0).unwrap();
        assert_eq!(
            tok("1mo").period_start(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 15, 0, 0).unwrap()
        );
        assert_eq!(
            tok("1y").period_start(now).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 31, 15, 0, 0).unwrap()
        );
        assert_eq!(
            tok("1wk").period_start(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 24, 15, 0, 0).unwrap()
        );
        assert_eq!(
            tok("90m").period_start(now).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 13, 30, 0).unwrap()
        );
    }
}
