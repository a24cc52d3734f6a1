mod dataset;
mod error;
mod load;
mod resample;
mod source;
mod store;
mod symbols;
mod types;

pub use dataset::Dataset;
pub use error::{LoadError, RangeError, SourceError, StoreError};
pub use load::{ColumnMapping, LoadOptions, load_csv, load_parquet};
pub use resample::{bounds, downsample};
pub use source::{HistoryDataSource, MemorySource, StoreSource};
pub use store::{DuckDbStore, StorageMode};
pub use symbols::load_symbols;
pub use types::{
    DataPoint, Generation, MINOR_UNITS_PER_MAJOR, OhlcItem, RefreshRequest, Symbol, TimeRange,
    to_major, to_minor,
};
