use std::fmt;
use std::io::Write;

use stockdata_core::{OhlcItem, SourceError, Symbol, TimeRange};
use stockdata_ui::ChartView;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

/// Renders each view update as a one-line summary.
pub struct TerminalView<W> {
    out: W,
}

impl<W: Write + Send + 'static> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            warn!("terminal view write failed: {err}");
        }
    }
}

fn format_ms(ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{ms}ms"))
}

impl<W: Write + Send + 'static> ChartView for TerminalView<W> {
    fn show_loading(&mut self, symbol: &Symbol) {
        self.emit(format_args!("{} loading...", symbol.ticker));
    }

    fn show_symbol(&mut self, symbol: &Symbol, latest: Option<&OhlcItem>) {
        match latest {
            Some(item) => self.emit(format_args!(
                "== {} ({}) {:.2} @ {} ==",
                symbol.ticker,
                symbol.name,
                item.close,
                format_ms(item.timestamp_ms),
            )),
            None => self.emit(format_args!("== {} ({}) ==", symbol.ticker, symbol.name)),
        }
    }

    fn set_series(&mut self, symbol: &Symbol, range: &TimeRange, items: &[OhlcItem]) {
        let (Some(first), Some(last)) = (items.first(), items.last()) else {
            self.emit(format_args!("{} {range} no data", symbol.ticker));
            return;
        };
        let high = items.iter().map(|i| i.high).fold(f64::MIN, f64::max);
        let low = items.iter().map(|i| i.low).fold(f64::MAX, f64::min);
        self.emit(format_args!(
            "{} {range} {} points {} .. {} low {low:.2} high {high:.2} close {:.2}",
            symbol.ticker,
            items.len(),
            format_ms(first.timestamp_ms),
            format_ms(last.timestamp_ms),
            last.close,
        ));
    }

    fn show_error(&mut self, symbol: &Symbol, error: &SourceError) {
        self.emit(format_args!("{} error: {error}", symbol.ticker));
    }

    fn show_empty(&mut self) {
        self.emit(format_args!("(no symbol selected)"));
    }
}
