mod config;
mod controller;
mod debounce;
pub mod logging;
mod runtime;
pub mod store;
mod view;

pub use config::{
    BATCH_CAP_ENV, DEBOUNCE_ENV, DEFAULT_BATCH_CAP, DEFAULT_DEBOUNCE_MS, RefreshConfig,
};
pub use controller::{
    BoundDataset, ChartRefreshController, CompletionOutcome, ControllerClosed, ControllerEvent,
    ControllerHandle, FetchCompletion, HeaderLookup,
};
pub use debounce::{DebounceState, DebounceTick, RangeDebouncer};
pub use logging::{LogOptions, init_logging};
pub use runtime::tokio_runtime;
pub use view::{ChartView, ViewStatus};
