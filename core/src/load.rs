use crate::{DataPoint, LoadError, to_minor};
use polars::datatypes::TimeUnit;
use polars::prelude::PlPathRef;
use polars::prelude::*;
use std::path::Path;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub timestamp: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            timestamp: "timestamp".into(),
            open: "open".into(),
            high: "high".into(),
            low: "low".into(),
            close: "close".into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub columns: ColumnMapping,
}

pub fn load_csv(path: impl AsRef<Path>, options: LoadOptions) -> Result<Vec<DataPoint>, LoadError> {
    let pl_path = PlPathRef::from_local_path(path.as_ref()).into_owned();
    let lf = LazyCsvReader::new(pl_path).with_has_header(true);
    let df = lf.finish()?.collect()?;
    parse_frame(df, &options.columns)
}

pub fn load_parquet(
    path: impl AsRef<Path>,
    options: LoadOptions,
) -> Result<Vec<DataPoint>, LoadError> {
    let pl_path = PlPathRef::from_local_path(path.as_ref()).into_owned();
    let lf = LazyFrame::scan_parquet(pl_path, ScanArgsParquet::default())?;
    let df = lf.collect()?;
    parse_frame(df, &options.columns)
}

/// Rows may arrive in any order; the result is sorted ascending and
/// duplicate timestamps are rejected.
fn parse_frame(df: DataFrame, columns: &ColumnMapping) -> Result<Vec<DataPoint>, LoadError> {
    let column = |name: &String| {
        df.column(name)
            .map_err(|_| LoadError::MissingColumn(name.clone()))
    };
    let ts = column(&columns.timestamp)?;
    let open = column(&columns.open)?;
    let high = column(&columns.high)?;
    let low = column(&columns.low)?;
    let close = column(&columns.close)?;

    let len = ts.len();
    if open.len() != len || high.len() != len || low.len() != len || close.len() != len {
        return Err(LoadError::LengthMismatch);
    }

    let mut rows = Vec::with_capacity(len);
    for idx in 0..len {
        let timestamp = to_datetime(ts.get(idx)?, idx)?;
        let open = to_minor_units(open.get(idx)?, &columns.open, idx)?;
        let high = to_minor_units(high.get(idx)?, &columns.high, idx)?;
        let low = to_minor_units(low.get(idx)?, &columns.low, idx)?;
        let close = to_minor_units(close.get(idx)?, &columns.close, idx)?;

        if low > high {
            return Err(LoadError::InvertedRange { row: idx, low, high });
        }

        rows.push((
            idx,
            DataPoint {
                timestamp,
                open,
                high,
                low,
                close,
            },
        ));
    }

    rows.sort_by_key(|(_, p)| p.timestamp);
    if let Some(w) = rows
        .windows(2)
        .find(|w| w[0].1.timestamp == w[1].1.timestamp)
    {
        return Err(LoadError::DuplicateTimestamp {
            row: w[1].0,
            timestamp: w[1].1.timestamp,
        });
    }

    Ok(rows.into_iter().map(|(_, p)| p).collect())
}

fn to_datetime(value: AnyValue, row: usize) -> Result<OffsetDateTime, LoadError> {
    match value {
        AnyValue::Datetime(ts, unit, _) => from_timestamp(ts, unit, row),
        AnyValue::Date(days) => {
            let secs = days as i64 * 86_400;
            OffsetDateTime::from_unix_timestamp(secs).map_err(|_| LoadError::UnsupportedTimestamp {
                row,
                value: format!("days since epoch: {days}"),
            })
        }
        AnyValue::Int64(secs) => OffsetDateTime::from_unix_timestamp(secs).map_err(|_| {
            LoadError::UnsupportedTimestamp {
                row,
                value: secs.to_string(),
            }
        }),
        AnyValue::String(s) => OffsetDateTime::parse(s, &Rfc3339).map_err(|err| {
            LoadError::UnsupportedTimestamp {
                row,
                value: format!("{s} ({err})"),
            }
        }),
        AnyValue::StringOwned(s) => to_datetime(AnyValue::String(&s), row),
        other => Err(LoadError::UnsupportedTimestamp {
            row,
            value: format!("{other:?}"),
        }),
    }
}

fn from_timestamp(
    value: i64,
    unit: TimeUnit,
    row: usize,
) -> Result<OffsetDateTime, LoadError> {
    let nanos = match unit {
        TimeUnit::Nanoseconds => value as i128,
        TimeUnit::Microseconds => value as i128 * 1_000,
        TimeUnit::Milliseconds => value as i128 * 1_000_000,
    };
    OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| LoadError::UnsupportedTimestamp {
        row,
        value: format!("{value} ({unit:?})"),
    })
}

/// Prices in files are decimal major units; integers are taken as already
/// being major units too.
fn to_minor_units(value: AnyValue, column: &str, row: usize) -> Result<i64, LoadError> {
    let invalid = |value: String| LoadError::InvalidNumber {
        column: column.to_string(),
        row,
        value,
    };
    let major = match value {
        AnyValue::Float64(v) => v,
        AnyValue::Float32(v) => v as f64,
        AnyValue::Int64(v) => v as f64,
        AnyValue::Int32(v) => v as f64,
        AnyValue::UInt64(v) => v as f64,
        AnyValue::UInt32(v) => v as f64,
        AnyValue::String(s) => s.trim().parse::<f64>().map_err(|_| invalid(s.to_string()))?,
        AnyValue::StringOwned(s) => return to_minor_units(AnyValue::String(&s), column, row),
        other => return Err(invalid(format!("{other:?}"))),
    };
    if !major.is_finite() {
        return Err(invalid(major.to_string()));
    }
    Ok(to_minor(major))
}
