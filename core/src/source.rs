use std::collections::HashMap;
use std::future::{self, Future};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{DataPoint, Dataset, DuckDbStore, SourceError, Symbol, TimeRange, downsample};

/// Read-only provider of capped historical series.
///
/// Implementations return points in ascending timestamp order, never more
/// than `limit` of them, fail with [`SourceError::DataUnavailable`] for an
/// unknown symbol and return an empty [`Dataset`] when nothing falls in range.
pub trait HistoryDataSource: Send + Sync + 'static {
    fn fetch(
        &self,
        symbol: &Symbol,
        range: TimeRange,
        limit: usize,
    ) -> impl Future<Output = Result<Dataset, SourceError>> + Send;

    /// Most recent point for `symbol`, `None` when it has no data yet.
    fn latest(
        &self,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<Option<DataPoint>, SourceError>> + Send;
}

/// Series held in memory, keyed by ticker. Useful for demos and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    series: HashMap<String, Vec<DataPoint>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the series for `ticker`. Points are sorted.
    pub fn insert(&mut self, ticker: impl Into<String>, mut points: Vec<DataPoint>) {
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);
        self.series.insert(ticker.into(), points);
    }

    pub fn with_series(mut self, ticker: impl Into<String>, points: Vec<DataPoint>) -> Self {
        self.insert(ticker, points);
        self
    }

    pub fn query(
        &self,
        symbol: &Symbol,
        range: TimeRange,
        limit: usize,
    ) -> Result<Dataset, SourceError> {
        let points = self
            .series
            .get(&symbol.ticker)
            .ok_or_else(|| SourceError::DataUnavailable {
                ticker: symbol.ticker.clone(),
            })?;
        let in_range: Vec<DataPoint> = points
            .iter()
            .filter(|p| range.contains(p.timestamp))
            .copied()
            .collect();
        Dataset::new(symbol.clone(), range, downsample(&in_range, limit))
    }

    pub fn latest_point(&self, symbol: &Symbol) -> Result<Option<DataPoint>, SourceError> {
        self.series
            .get(&symbol.ticker)
            .map(|points| points.last().copied())
            .ok_or_else(|| SourceError::DataUnavailable {
                ticker: symbol.ticker.clone(),
            })
    }
}

impl HistoryDataSource for MemorySource {
    fn fetch(
        &self,
        symbol: &Symbol,
        range: TimeRange,
        limit: usize,
    ) -> impl Future<Output = Result<Dataset, SourceError>> + Send {
        future::ready(self.query(symbol, range, limit))
    }

    fn latest(
        &self,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<Option<DataPoint>, SourceError>> + Send {
        future::ready(self.latest_point(symbol))
    }
}

/// DuckDB-backed source. Queries run on the blocking pool so the caller's
/// task never waits on disk.
#[derive(Clone)]
pub struct StoreSource {
    store: Arc<Mutex<DuckDbStore>>,
}

impl StoreSource {
    pub fn new(store: Arc<Mutex<DuckDbStore>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<Mutex<DuckDbStore>> {
        &self.store
    }
}

fn query_store(
    store: &Mutex<DuckDbStore>,
    symbol: &Symbol,
    range: TimeRange,
    limit: usize,
) -> Result<Dataset, SourceError> {
    let guard = store
        .lock()
        .map_err(|_| SourceError::Worker("store mutex poisoned".into()))?;
    if !guard.has_symbol(&symbol.ticker)? {
        return Err(SourceError::DataUnavailable {
            ticker: symbol.ticker.clone(),
        });
    }
    let points = guard.load_points(&symbol.ticker, &range)?;
    drop(guard);

    let total = points.len();
    let points = downsample(&points, limit);
    debug!(
        ticker = %symbol.ticker,
        %range,
        total,
        returned = points.len(),
        "store query"
    );
    Dataset::new(symbol.clone(), range, points)
}

fn query_latest(store: &Mutex<DuckDbStore>, symbol: &Symbol) -> Result<Option<DataPoint>, SourceError> {
    let guard = store
        .lock()
        .map_err(|_| SourceError::Worker("store mutex poisoned".into()))?;
    if !guard.has_symbol(&symbol.ticker)? {
        return Err(SourceError::DataUnavailable {
            ticker: symbol.ticker.clone(),
        });
    }
    Ok(guard.latest_point(&symbol.ticker)?)
}

impl HistoryDataSource for StoreSource {
    fn fetch(
        &self,
        symbol: &Symbol,
        range: TimeRange,
        limit: usize,
    ) -> impl Future<Output = Result<Dataset, SourceError>> + Send {
        let store = Arc::clone(&self.store);
        let symbol = symbol.clone();
        async move {
            tokio::task::spawn_blocking(move || query_store(&store, &symbol, range, limit))
                .await
                .map_err(|e| SourceError::Worker(e.to_string()))?
        }
    }

    fn latest(
        &self,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<Option<DataPoint>, SourceError>> + Send {
        let store = Arc::clone(&self.store);
        let symbol = symbol.clone();
        async move {
            tokio::task::spawn_blocking(move || query_latest(&store, &symbol))
                .await
                .map_err(|e| SourceError::Worker(e.to_string()))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime, macros::datetime};

    fn series(start: OffsetDateTime, n: usize) -> Vec<DataPoint> {
        (0..n)
            .map(|i| DataPoint {
                timestamp: start + Duration::hours(i as i64),
                open: 1_000 + i as i64,
                high: 1_100 + i as i64,
                low: 900 + i as i64,
                close: 1_050 + i as i64,
            })
            .collect()
    }

    fn acme() -> Symbol {
        Symbol::new("ACME", "Acme Corp")
    }

    fn assert_contract(dataset: &Dataset, limit: usize) {
        assert!(dataset.len() <= limit);
        assert!(
            dataset
                .points()
                .windows(2)
                .all(|w| w[0].timestamp < w[1].timestamp)
        );
    }

    #[test]
    fn memory_source_caps_and_orders() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let source = MemorySource::new().with_series("ACME", series(start, 1_000));
        for limit in [1, 50, 300, 1_000, 5_000] {
            let dataset = source.query(&acme(), TimeRange::All, limit).unwrap();
            assert_contract(&dataset, limit);
            assert!(!dataset.is_empty());
        }
    }

    #[test]
    fn memory_source_filters_range() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let source = MemorySource::new().with_series("ACME", series(start, 48));
        let range = TimeRange::between(start + Duration::hours(10), start + Duration::hours(19))
            .unwrap();
        let dataset = source.query(&acme(), range, 300).unwrap();
        assert_eq!(dataset.len(), 10);
        assert_eq!(dataset.range(), &range);
        assert!(dataset.points().iter().all(|p| range.contains(p.timestamp)));
    }

    #[test]
    fn unknown_symbol_is_unavailable_and_empty_range_is_not_an_error() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let source = MemorySource::new().with_series("ACME", series(start, 5));

        let err = source
            .query(&Symbol::new("NOPE", "Nope"), TimeRange::All, 300)
            .unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable { ticker } if ticker == "NOPE"));

        let later = TimeRange::From(start + Duration::days(30));
        let dataset = source.query(&acme(), later, 300).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn memory_source_latest_point() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let points = series(start, 5);
        let source = MemorySource::new()
            .with_series("ACME", points.clone())
            .with_series("EMPTY", Vec::new());
        assert_eq!(source.latest_point(&acme()).unwrap(), points.last().copied());
        assert_eq!(
            source.latest_point(&Symbol::new("EMPTY", "No Rows")).unwrap(),
            None
        );
        assert!(source.latest_point(&Symbol::new("NOPE", "Nope")).is_err());
    }

    #[tokio::test]
    async fn store_source_fetches_through_blocking_pool() {
        let start = datetime!(2024-01-01 00:00:00 UTC);
        let store = DuckDbStore::open_in_memory().unwrap();
        store.upsert_symbol(&acme()).unwrap();
        store.write_points("ACME", &series(start, 700)).unwrap();
        store.upsert_symbol(&Symbol::new("EMPTY", "No Rows")).unwrap();
        let source = StoreSource::new(Arc::new(Mutex::new(store)));

        let full = source.fetch(&acme(), TimeRange::All, 300).await.unwrap();
        assert_contract(&full, 300);
        assert_eq!(full.points()[0].timestamp, start);

        let range = TimeRange::between(start, start + Duration::hours(99)).unwrap();
        let scoped = source.fetch(&acme(), range, 300).await.unwrap();
        assert_eq!(scoped.len(), 100);

        let empty = source
            .fetch(&Symbol::new("EMPTY", "No Rows"), TimeRange::All, 300)
            .await
            .unwrap();
        assert!(empty.is_empty());

        let err = source
            .fetch(&Symbol::new("GONE", "Gone"), TimeRange::All, 300)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::DataUnavailable { .. }));

        let latest = source.latest(&acme()).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, start + Duration::hours(699));
        assert_eq!(
            source.latest(&Symbol::new("EMPTY", "No Rows")).await.unwrap(),
            None
        );
        assert!(source.latest(&Symbol::new("GONE", "Gone")).await.is_err());
    }
}
