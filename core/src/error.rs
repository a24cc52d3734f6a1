use polars::prelude::PolarsError;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("column '{0}' not found")]
    MissingColumn(String),
    #[error("column lengths are inconsistent")]
    LengthMismatch,
    #[error("low > high at row {row} (low={low}, high={high})")]
    InvertedRange { row: usize, low: i64, high: i64 },
    #[error("unsupported timestamp at row {row}: {value}")]
    UnsupportedTimestamp { row: usize, value: String },
    #[error("invalid numeric value in column '{column}' at row {row}: {value}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },
    #[error("duplicate timestamp {timestamp} at row {row}")]
    DuplicateTimestamp { row: usize, timestamp: OffsetDateTime },
    #[error("failed to read symbols csv: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("disk path is required to use disk-backed storage")]
    MissingDiskPath,
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error("stored timestamp {0} is out of range")]
    Timestamp(i64),
}

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("range start {start} is after end {end}")]
    Reversed {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },
    #[error("range bound {0} is not a finite number")]
    NotFinite(f64),
    #[error("range bound {0} ms is outside the supported time span")]
    OutOfRange(f64),
}

/// Failure of a single history fetch.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no data available for symbol '{ticker}'")]
    DataUnavailable { ticker: String },
    #[error("source returned points out of order at index {index}")]
    Unordered { index: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("fetch worker failed: {0}")]
    Worker(String),
}
