use stockdata_core::{OhlcItem, SourceError, Symbol, TimeRange};

/// Rendering side of the chart. The controller only ever calls these from
/// its owning task.
pub trait ChartView: Send + 'static {
    /// A new symbol was selected. Whatever is rendered belongs to the
    /// previous selection and should be replaced by a placeholder.
    fn show_loading(&mut self, symbol: &Symbol);

    /// Header for the selected symbol: ticker, name and the most recent
    /// point when the source has one.
    fn show_symbol(&mut self, symbol: &Symbol, latest: Option<&OhlcItem>);

    /// Replace the rendered series. `items` is ascending and may be empty
    /// when the range holds no data.
    fn set_series(&mut self, symbol: &Symbol, range: &TimeRange, items: &[OhlcItem]);

    fn show_error(&mut self, symbol: &Symbol, error: &SourceError);

    /// No symbol selected.
    fn show_empty(&mut self);
}

/// Last thing the controller pushed to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewStatus {
    Empty,
    Loading(Symbol),
    Ready {
        symbol: Symbol,
        range: TimeRange,
        points: usize,
    },
    Failed {
        symbol: Symbol,
        message: String,
    },
}
