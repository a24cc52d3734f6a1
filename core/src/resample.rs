use crate::DataPoint;

/// Lowest low and highest high across `points`, in minor units.
pub fn bounds(points: &[DataPoint]) -> Option<(i64, i64)> {
    let first = points.first()?;
    let mut min = first.low;
    let mut max = first.high;
    for p in points {
        min = min.min(p.low);
        max = max.max(p.high);
    }
    Some((min, max))
}

/// Reduces an ascending series to at most `limit` points by merging
/// consecutive runs of `ceil(len / limit)` points into one OHLC point.
/// Each merged point keeps the timestamp of its first member.
pub fn downsample(points: &[DataPoint], limit: usize) -> Vec<DataPoint> {
    if limit == 0 || points.is_empty() {
        return Vec::new();
    }
    if points.len() <= limit {
        return points.to_vec();
    }

    let step = points.len().div_ceil(limit);
    points.chunks(step).filter_map(merge).collect()
}

fn merge(chunk: &[DataPoint]) -> Option<DataPoint> {
    let first = chunk.first()?;
    let last = chunk.last()?;
    let (low, high) = bounds(chunk)?;
    Some(DataPoint {
        timestamp: first.timestamp,
        open: first.open,
        high,
        low,
        close: last.close,
    })
}
