use std::ops::ControlFlow;
use std::sync::Arc;

use stockdata_core::{
    DataPoint, Dataset, Generation, HistoryDataSource, RefreshRequest, SourceError, Symbol,
    TimeRange,
};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RefreshConfig;
use crate::debounce::{DebounceTick, RangeDebouncer};
use crate::view::{ChartView, ViewStatus};

/// Everything the controller reacts to arrives as one of these, on a single
/// channel drained by the owning task.
#[derive(Debug)]
pub enum ControllerEvent {
    SymbolSelected(Option<Symbol>),
    /// Chart axis extremes in epoch milliseconds.
    VisibleRangeChanged { min_ms: f64, max_ms: f64 },
    Debounce(DebounceTick),
    FetchCompleted(FetchCompletion),
    HeaderLoaded(HeaderLookup),
    /// Settle pending work, then stop.
    Drain,
    /// Stop now; in-flight results are discarded.
    Shutdown,
}

impl From<DebounceTick> for ControllerEvent {
    fn from(tick: DebounceTick) -> Self {
        ControllerEvent::Debounce(tick)
    }
}

/// Result of one fetch, tagged with the request that produced it.
#[derive(Debug)]
pub struct FetchCompletion {
    pub request: RefreshRequest,
    pub result: Result<Dataset, SourceError>,
}

/// Most recent point for a freshly selected symbol.
#[derive(Debug)]
pub struct HeaderLookup {
    pub generation: Generation,
    pub symbol: Symbol,
    pub result: Result<Option<DataPoint>, SourceError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Bound,
    Failed,
    /// Superseded by a newer request; nothing was touched.
    Stale,
}

#[derive(Debug, Clone)]
pub struct BoundDataset {
    pub generation: Generation,
    pub dataset: Dataset,
}

#[derive(Debug, Error)]
#[error("chart controller has shut down")]
pub struct ControllerClosed;

/// Cheap, cloneable entry point for the symbol list and the chart widget.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: UnboundedSender<ControllerEvent>,
}

impl ControllerHandle {
    pub fn symbol_selected(&self, symbol: Option<Symbol>) -> Result<(), ControllerClosed> {
        self.send(ControllerEvent::SymbolSelected(symbol))
    }

    pub fn visible_range_changed(&self, min_ms: f64, max_ms: f64) -> Result<(), ControllerClosed> {
        self.send(ControllerEvent::VisibleRangeChanged { min_ms, max_ms })
    }

    /// Fires any pending range right away and stops once the latest request
    /// has been rendered.
    pub fn drain(&self) -> Result<(), ControllerClosed> {
        self.send(ControllerEvent::Drain)
    }

    pub fn shutdown(&self) -> Result<(), ControllerClosed> {
        self.send(ControllerEvent::Shutdown)
    }

    fn send(&self, event: ControllerEvent) -> Result<(), ControllerClosed> {
        self.tx.send(event).map_err(|_| ControllerClosed)
    }
}

/// Owns the selected symbol and the dataset bound to the view.
///
/// Fetches run on spawned tasks and report back through the event channel.
/// A completion is only applied when its generation equals the latest one
/// issued, so bindings happen in increasing generation order no matter how
/// fetches finish. Superseded fetches are never cancelled, just ignored.
pub struct ChartRefreshController<S, V> {
    source: Arc<S>,
    view: V,
    config: RefreshConfig,
    symbol: Option<Symbol>,
    latest: Generation,
    /// Latest generation whose outcome reached the view.
    resolved: Generation,
    /// Reset generation still waiting for its header.
    header: Option<Generation>,
    draining: bool,
    bound: Option<BoundDataset>,
    status: ViewStatus,
    debouncer: RangeDebouncer<TimeRange, ControllerEvent>,
    events: UnboundedSender<ControllerEvent>,
}

impl<S, V> ChartRefreshController<S, V>
where
    S: HistoryDataSource,
    V: ChartView,
{
    pub fn new(
        source: Arc<S>,
        view: V,
        config: RefreshConfig,
    ) -> (Self, UnboundedReceiver<ControllerEvent>) {
        let (events, rx) = unbounded_channel();
        let controller = Self {
            source,
            view,
            config,
            symbol: None,
            latest: Generation::default(),
            resolved: Generation::default(),
            header: None,
            draining: false,
            bound: None,
            status: ViewStatus::Empty,
            debouncer: RangeDebouncer::new(config.debounce, events.clone()),
            events,
        };
        (controller, rx)
    }

    /// Starts the controller on its own task. The task ends on
    /// [`ControllerHandle::shutdown`] or a completed
    /// [`ControllerHandle::drain`] and hands the view back.
    pub fn spawn(source: Arc<S>, view: V, config: RefreshConfig) -> (ControllerHandle, JoinHandle<V>) {
        let (controller, rx) = Self::new(source, view, config);
        let handle = controller.handle();
        (handle, tokio::spawn(controller.run(rx)))
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            tx: self.events.clone(),
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    pub fn current_symbol(&self) -> Option<&Symbol> {
        self.symbol.as_ref()
    }

    pub fn latest_generation(&self) -> Generation {
        self.latest
    }

    pub fn bound(&self) -> Option<&BoundDataset> {
        self.bound.as_ref()
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// No pending range, no unresolved fetch and no header outstanding.
    pub fn is_idle(&self) -> bool {
        !self.debouncer.is_pending() && self.resolved == self.latest && self.header.is_none()
    }

    pub async fn run(mut self, mut events: UnboundedReceiver<ControllerEvent>) -> V {
        while let Some(event) = events.recv().await {
            if self.handle_event(event).is_break() {
                break;
            }
        }
        self.debouncer.cancel();
        debug!(latest = %self.latest, "chart controller stopped");
        self.view
    }

    pub fn handle_event(&mut self, event: ControllerEvent) -> ControlFlow<()> {
        match event {
            ControllerEvent::SymbolSelected(symbol) => self.symbol_selected(symbol),
            ControllerEvent::VisibleRangeChanged { min_ms, max_ms } => {
                self.visible_range_changed(min_ms, max_ms)
            }
            ControllerEvent::Debounce(tick) => {
                if let Some(range) = self.debouncer.fire(tick) {
                    self.refresh(range);
                }
            }
            ControllerEvent::FetchCompleted(completion) => {
                self.complete(completion);
            }
            ControllerEvent::HeaderLoaded(lookup) => self.header_loaded(lookup),
            ControllerEvent::Drain => self.drain(),
            ControllerEvent::Shutdown => return ControlFlow::Break(()),
        }
        if self.draining && self.is_idle() {
            debug!(latest = %self.latest, "drained");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    pub fn symbol_selected(&mut self, symbol: Option<Symbol>) {
        match symbol {
            Some(symbol) => self.reset(symbol),
            None => self.symbol_cleared(),
        }
    }

    /// Switches to `symbol`, looks up its header value and fetches its full
    /// history right away.
    pub fn reset(&mut self, symbol: Symbol) {
        self.debouncer.cancel();
        self.bound = None;
        self.view.show_loading(&symbol);
        self.status = ViewStatus::Loading(symbol.clone());
        self.symbol = Some(symbol.clone());

        let generation = self.latest.next();
        self.header = Some(generation);
        self.lookup_header(symbol.clone(), generation);
        self.issue(symbol, TimeRange::All);
    }

    pub fn visible_range_changed(&mut self, min_ms: f64, max_ms: f64) {
        match TimeRange::from_epoch_millis(min_ms, max_ms) {
            Ok(range) => self.range_changed(range),
            Err(err) => warn!(min_ms, max_ms, "ignoring visible range: {err}"),
        }
    }

    /// Queues `range` behind the debounce window.
    pub fn range_changed(&mut self, range: TimeRange) {
        if self.symbol.is_none() {
            debug!(%range, "range change without a symbol");
            return;
        }
        self.debouncer.notify(range);
    }

    /// Fetches `range` for the current symbol immediately.
    pub fn refresh(&mut self, range: TimeRange) {
        match self.symbol.clone() {
            Some(symbol) => {
                self.issue(symbol, range);
            }
            None => debug!(%range, "settled range without a symbol"),
        }
    }

    pub fn symbol_cleared(&mut self) {
        self.debouncer.cancel();
        self.symbol = None;
        self.bound = None;
        self.header = None;
        // in-flight fetches must not bind after the view went blank
        self.latest = self.latest.next();
        self.resolved = self.latest;
        self.status = ViewStatus::Empty;
        self.view.show_empty();
        debug!(latest = %self.latest, "symbol cleared");
    }

    /// Stops accepting the debounce delay; the controller exits once idle.
    pub fn drain(&mut self) {
        self.draining = true;
        if let Some(range) = self.debouncer.flush() {
            debug!(%range, "flushing pending range");
            self.refresh(range);
        }
    }

    fn lookup_header(&self, symbol: Symbol, generation: Generation) {
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = source.latest(&symbol).await;
            let _ = events.send(ControllerEvent::HeaderLoaded(HeaderLookup {
                generation,
                symbol,
                result,
            }));
        });
    }

    fn header_loaded(&mut self, lookup: HeaderLookup) {
        if self.header != Some(lookup.generation) {
            debug!(generation = %lookup.generation, "dropping stale header");
            return;
        }
        self.header = None;
        let latest = match lookup.result {
            Ok(point) => point.map(|p| p.to_chart_item()),
            Err(err) => {
                debug!(ticker = %lookup.symbol.ticker, "no header value: {err}");
                None
            }
        };
        self.view.show_symbol(&lookup.symbol, latest.as_ref());
    }

    fn issue(&mut self, symbol: Symbol, range: TimeRange) -> Generation {
        self.latest = self.latest.next();
        let request = RefreshRequest {
            symbol,
            range,
            generation: self.latest,
        };
        debug!(
            generation = %request.generation,
            ticker = %request.symbol.ticker,
            %range,
            "issuing fetch"
        );

        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        let limit = self.config.batch_cap;
        tokio::spawn(async move {
            let result = source.fetch(&request.symbol, request.range, limit).await;
            let _ = events.send(ControllerEvent::FetchCompleted(FetchCompletion {
                request,
                result,
            }));
        });
        self.latest
    }

    /// Applies a finished fetch if it is still the latest request.
    pub fn complete(&mut self, completion: FetchCompletion) -> CompletionOutcome {
        let FetchCompletion { request, result } = completion;
        if request.generation != self.latest {
            debug!(
                generation = %request.generation,
                latest = %self.latest,
                ok = result.is_ok(),
                "dropping stale result"
            );
            return CompletionOutcome::Stale;
        }
        self.resolved = request.generation;

        match result {
            Ok(dataset) => {
                let cap = self.config.batch_cap;
                let dataset = if dataset.len() > cap {
                    warn!(
                        generation = %request.generation,
                        len = dataset.len(),
                        cap,
                        "source exceeded batch cap, down-sampling"
                    );
                    dataset.capped(cap)
                } else {
                    dataset
                };
                let items = dataset.chart_items();
                self.view
                    .set_series(&request.symbol, dataset.range(), &items);
                info!(
                    generation = %request.generation,
                    ticker = %request.symbol.ticker,
                    range = %dataset.range(),
                    points = items.len(),
                    "series bound"
                );
                self.status = ViewStatus::Ready {
                    symbol: request.symbol,
                    range: *dataset.range(),
                    points: items.len(),
                };
                self.bound = Some(BoundDataset {
                    generation: request.generation,
                    dataset,
                });
                CompletionOutcome::Bound
            }
            Err(error) => {
                warn!(
                    generation = %request.generation,
                    ticker = %request.symbol.ticker,
                    "fetch failed: {error}"
                );
                self.view.show_error(&request.symbol, &error);
                self.status = ViewStatus::Failed {
                    symbol: request.symbol,
                    message: error.to_string(),
                };
                self.bound = None;
                CompletionOutcome::Failed
            }
        }
    }
}
