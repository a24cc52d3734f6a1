use std::fmt;

use time::OffsetDateTime;

use crate::RangeError;

/// Minor units (cents) per major currency unit.
pub const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub ticker: String,
    pub name: String,
}

impl Symbol {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ticker)
    }
}

/// A single OHLC sample. Prices are integer minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPoint {
    pub timestamp: OffsetDateTime,
    pub open: i64,
    pub high: i64,
    pub low: i64,
    pub close: i64,
}

/// Decimal view of a [`DataPoint`], only built when handing data to a chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcItem {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl DataPoint {
    pub fn to_chart_item(&self) -> OhlcItem {
        OhlcItem {
            timestamp_ms: (self.timestamp.unix_timestamp_nanos() / 1_000_000) as i64,
            open: to_major(self.open),
            high: to_major(self.high),
            low: to_major(self.low),
            close: to_major(self.close),
        }
    }
}

pub fn to_major(minor: i64) -> f64 {
    minor as f64 / MINOR_UNITS_PER_MAJOR
}

pub fn to_minor(major: f64) -> i64 {
    (major * MINOR_UNITS_PER_MAJOR).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    All,
    From(OffsetDateTime),
    Until(OffsetDateTime),
    Between {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },
}

impl TimeRange {
    pub fn between(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Reversed { start, end });
        }
        Ok(TimeRange::Between { start, end })
    }

    /// Converts chart axis extremes (epoch milliseconds as floats) into an
    /// absolute UTC range. Fractional milliseconds are truncated.
    pub fn from_epoch_millis(min_ms: f64, max_ms: f64) -> Result<Self, RangeError> {
        let start = instant_from_millis(min_ms)?;
        let end = instant_from_millis(max_ms)?;
        Self::between(start, end)
    }

    pub fn start(&self) -> Option<OffsetDateTime> {
        match *self {
            TimeRange::From(start) | TimeRange::Between { start, .. } => Some(start),
            TimeRange::All | TimeRange::Until(_) => None,
        }
    }

    pub fn end(&self) -> Option<OffsetDateTime> {
        match *self {
            TimeRange::Until(end) | TimeRange::Between { end, .. } => Some(end),
            TimeRange::All | TimeRange::From(_) => None,
        }
    }

    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        self.start().is_none_or(|start| ts >= start) && self.end().is_none_or(|end| ts <= end)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::All => f.write_str("[all]"),
            TimeRange::From(start) => write!(f, "[{start} ..)"),
            TimeRange::Until(end) => write!(f, "(.. {end}]"),
            TimeRange::Between { start, end } => write!(f, "[{start} .. {end}]"),
        }
    }
}

fn instant_from_millis(ms: f64) -> Result<OffsetDateTime, RangeError> {
    if !ms.is_finite() {
        return Err(RangeError::NotFinite(ms));
    }
    let nanos = (ms.trunc() as i128) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| RangeError::OutOfRange(ms))
}

/// Monotonic request tag; higher means more recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub symbol: Symbol,
    pub range: TimeRange,
    pub generation: Generation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn epoch_millis_are_absolute_instants() {
        let range = TimeRange::from_epoch_millis(1_704_067_200_000.0, 1_704_153_600_999.9).unwrap();
        assert_eq!(range.start(), Some(datetime!(2024-01-01 00:00:00 UTC)));
        assert_eq!(
            range.end(),
            Some(datetime!(2024-01-02 00:00:00.999 UTC))
        );
    }

    #[test]
    fn rejects_reversed_and_non_finite_bounds() {
        assert!(matches!(
            TimeRange::from_epoch_millis(2_000.0, 1_000.0),
            Err(RangeError::Reversed { .. })
        ));
        assert!(matches!(
            TimeRange::from_epoch_millis(f64::NAN, 1_000.0),
            Err(RangeError::NotFinite(_))
        ));
        assert!(matches!(
            TimeRange::from_epoch_millis(0.0, f64::INFINITY),
            Err(RangeError::NotFinite(_))
        ));
    }

    #[test]
    fn contains_respects_open_bounds() {
        let t = datetime!(2024-03-01 12:00:00 UTC);
        assert!(TimeRange::All.contains(t));
        assert!(TimeRange::From(t).contains(t));
        assert!(!TimeRange::From(t + time::Duration::SECOND).contains(t));
        assert!(TimeRange::Until(t).contains(t));
        assert!(!TimeRange::Until(t - time::Duration::SECOND).contains(t));
        let between = TimeRange::between(t, t).unwrap();
        assert!(between.contains(t));
    }

    #[test]
    fn chart_item_converts_minor_units() {
        let point = DataPoint {
            timestamp: datetime!(2024-01-01 00:00:01 UTC),
            open: 12_345,
            high: 12_500,
            low: 12_000,
            close: 12_399,
        };
        let item = point.to_chart_item();
        assert_eq!(item.timestamp_ms, 1_704_067_201_000);
        assert_eq!(item.open, 123.45);
        assert_eq!(item.close, 123.99);
        assert_eq!(to_minor(123.45), 12_345);
        assert_eq!(to_minor(0.5), 50);
    }

    #[test]
    fn generations_increase() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().next(), Generation(2));
    }
}
