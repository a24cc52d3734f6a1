use crate::{DataPoint, OhlcItem, SourceError, Symbol, TimeRange, downsample};

/// Ascending, capped series tied to the (symbol, range) pair that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    symbol: Symbol,
    range: TimeRange,
    points: Vec<DataPoint>,
}

impl Dataset {
    /// Fails if timestamps are not strictly increasing.
    pub fn new(
        symbol: Symbol,
        range: TimeRange,
        points: Vec<DataPoint>,
    ) -> Result<Self, SourceError> {
        if let Some(index) = points
            .windows(2)
            .position(|w| w[0].timestamp >= w[1].timestamp)
        {
            return Err(SourceError::Unordered { index: index + 1 });
        }
        Ok(Self {
            symbol,
            range,
            points,
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn range(&self) -> &TimeRange {
        &self.range
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn chart_items(&self) -> Vec<OhlcItem> {
        self.points.iter().map(DataPoint::to_chart_item).collect()
    }

    /// Down-samples to at most `limit` points. Ordering is preserved.
    pub fn capped(self, limit: usize) -> Self {
        if self.points.len() <= limit {
            return self;
        }
        Self {
            points: downsample(&self.points, limit),
            ..self
        }
    }
}
