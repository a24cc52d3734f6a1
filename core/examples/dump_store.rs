use stockdata_core::{DuckDbStore, TimeRange};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/stockdata.duckdb".to_string());
    if !Path::new(&path).exists() {
        eprintln!("store file not found at {path}");
        return Ok(());
    }

    let store = DuckDbStore::open_disk(&path)?;

    println!("# symbols");
    for symbol in store.symbols()? {
        let points = store.load_points(&symbol.ticker, &TimeRange::All)?;
        let span = match (points.first(), points.last()) {
            (Some(first), Some(last)) => format!("{} .. {}", first.timestamp, last.timestamp),
            _ => "empty".to_string(),
        };
        println!("{} ({}): {} points, {span}", symbol.ticker, symbol.name, points.len());
    }

    Ok(())
}
