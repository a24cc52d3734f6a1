use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use stockdata_core::{DuckDbStore, StoreSource, Symbol};
use stockdata_ui::{
    ChartRefreshController, ControllerHandle, RefreshConfig, store::shared_store, tokio_runtime,
};
use tracing::{info, warn};

use crate::terminal::TerminalView;

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select(String),
    Clear,
    Zoom { min_ms: f64, max_ms: f64 },
    Quit,
}

/// Parses a stdin line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = parts.collect();
    let command = match (word.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("select", [ticker]) => Command::Select(ticker.to_ascii_uppercase()),
        ("clear", []) => Command::Clear,
        ("zoom", [min, max]) => Command::Zoom {
            min_ms: parse_ms(min)?,
            max_ms: parse_ms(max)?,
        },
        ("quit" | "exit", []) => Command::Quit,
        _ => {
            return Err(format!(
                "unrecognised command: {line} (select <ticker> | clear | zoom <min_ms> <max_ms> | quit)"
            ));
        }
    };
    Ok(Some(command))
}

fn parse_ms(raw: &str) -> Result<f64, String> {
    raw.parse()
        .map_err(|_| format!("invalid epoch milliseconds: {raw}"))
}

fn lookup_symbol(store: &Mutex<DuckDbStore>, ticker: &str) -> Result<Symbol> {
    let guard = store
        .lock()
        .map_err(|_| anyhow!("store mutex poisoned"))?;
    // unknown tickers still go through the controller so the view reports them
    Ok(guard
        .symbol(ticker)?
        .unwrap_or_else(|| Symbol::new(ticker, ticker)))
}

fn dispatch(
    store: &Mutex<DuckDbStore>,
    handle: &ControllerHandle,
    command: Command,
) -> Result<bool> {
    match command {
        Command::Select(ticker) => handle.symbol_selected(Some(lookup_symbol(store, &ticker)?))?,
        Command::Clear => handle.symbol_selected(None)?,
        Command::Zoom { min_ms, max_ms } => handle.visible_range_changed(min_ms, max_ms)?,
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

/// Runs the refresh controller against the store at `db`, driven by `input`
/// until `quit` or end of input. Work still pending at that point is allowed
/// to finish; the writer is handed back afterwards.
pub fn run<W: Write + Send + 'static>(
    db: &Path,
    ticker: Option<String>,
    config: RefreshConfig,
    input: impl BufRead,
    out: W,
) -> Result<W> {
    let store = shared_store(db)?;
    let runtime = tokio_runtime()?;
    let _guard = runtime.enter();

    let source = Arc::new(StoreSource::new(Arc::clone(&store)));
    let view = TerminalView::new(out);
    let (handle, task) = ChartRefreshController::spawn(source, view, config);
    info!(
        db = %db.display(),
        debounce_ms = config.debounce.as_millis() as u64,
        batch_cap = config.batch_cap,
        "chart session started"
    );

    if let Some(ticker) = ticker {
        dispatch(&store, &handle, Command::Select(ticker))?;
    }

    for line in input.lines() {
        let line = line?;
        match parse_command(&line) {
            Ok(Some(command)) => {
                if !dispatch(&store, &handle, command)? {
                    break;
                }
            }
            Ok(None) => {}
            Err(msg) => warn!("{msg}"),
        }
    }

    handle.drain()?;
    let view = runtime.block_on(task)?;
    info!("chart session finished");
    Ok(view.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;
    use stockdata_core::DataPoint;
    use time::OffsetDateTime;
    use time::macros::datetime;

    const START: OffsetDateTime = datetime!(2024-01-01 00:00:00 UTC);

    fn hour_ms(h: i64) -> i64 {
        (START + time::Duration::hours(h)).unix_timestamp() * 1_000
    }

    fn seeded_db(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "stockdata-session-{}-{name}.duckdb",
            std::process::id()
        ));
        std::fs::remove_file(&path).ok();
        let store = DuckDbStore::open_disk(&path).unwrap();
        store.upsert_symbol(&Symbol::new("ACME", "Acme Corp")).unwrap();
        let points: Vec<DataPoint> = (0..48)
            .map(|i| DataPoint {
                timestamp: START + time::Duration::hours(i),
                open: 10_000,
                high: 10_100,
                low: 9_900,
                close: 10_000 + i,
            })
            .collect();
        store.write_points("ACME", &points).unwrap();
        path
    }

    fn session(db: &Path, ticker: Option<&str>, input: &str) -> Vec<String> {
        let config = RefreshConfig::builtin();
        let out = run(
            db,
            ticker.map(str::to_string),
            config,
            Cursor::new(input.to_string()),
            Vec::new(),
        )
        .unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn end_of_input_still_renders_selected_series() {
        let db = seeded_db("eof");
        let lines = session(&db, None, "select acme\n");
        assert_eq!(lines[0], "ACME loading...");
        assert!(
            lines
                .iter()
                .any(|l| l.starts_with("== ACME (Acme Corp) 100.47 @ 2024-01-02T23:00:00Z"))
        );
        assert!(lines.iter().any(|l| l.contains(" 48 points ")));
        std::fs::remove_file(db).ok();
    }

    #[test]
    fn zoom_before_quit_is_fetched() {
        let db = seeded_db("quit");
        let input = format!(
            "zoom {} {}\nquit\nselect NOPE\n",
            hour_ms(10),
            hour_ms(20)
        );
        let lines = session(&db, Some("ACME"), &input);
        let last_series = lines
            .iter()
            .rev()
            .find(|l| l.contains(" points "))
            .unwrap();
        assert!(last_series.contains(" 11 points "), "{last_series}");
        assert!(!lines.iter().any(|l| l.contains("NOPE")));
        std::fs::remove_file(db).ok();
    }

    #[test]
    fn commands_parse() {
        assert_eq!(
            parse_command("select acme").unwrap(),
            Some(Command::Select("ACME".into()))
        );
        assert_eq!(parse_command("  CLEAR ").unwrap(), Some(Command::Clear));
        assert_eq!(
            parse_command("zoom 1704067200000 1704070800000.5").unwrap(),
            Some(Command::Zoom {
                min_ms: 1_704_067_200_000.0,
                max_ms: 1_704_070_800_000.5,
            })
        );
        assert_eq!(parse_command("quit").unwrap(), Some(Command::Quit));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert!(parse_command("select").is_err());
        assert!(parse_command("zoom 1 two").is_err());
        assert!(parse_command("zoom 1").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn unknown_ticker_falls_back_to_bare_symbol() {
        let store = Mutex::new(DuckDbStore::open_in_memory().unwrap());
        store
            .lock()
            .unwrap()
            .upsert_symbol(&Symbol::new("ACME", "Acme Corp"))
            .unwrap();
        assert_eq!(
            lookup_symbol(&store, "ACME").unwrap(),
            Symbol::new("ACME", "Acme Corp")
        );
        assert_eq!(lookup_symbol(&store, "NOPE").unwrap(), Symbol::new("NOPE", "NOPE"));
    }
}
