use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use stockdata_core::{DuckDbStore, Symbol, to_major};
use stockdata_ui::{LogOptions, RefreshConfig, init_logging, store::import_universe};
use time::format_description::well_known::Rfc3339;
use tracing::info;

mod input;
mod session;
mod terminal;
use input::{InputFormat, detect_format, load_points};

#[derive(Parser, Debug)]
#[command(name = "stockdata", about = "Stock history store and range-driven chart session")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load OHLC rows from a CSV or Parquet file into the store.
    Import {
        /// DuckDB database file.
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        ticker: String,
        /// Display name. Defaults to the ticker.
        #[arg(long)]
        name: Option<String>,
        /// Explicitly set the file format. If omitted, inferred from extension.
        #[arg(long, value_enum)]
        format: Option<InputFormat>,
        path: PathBuf,
    },
    /// List stored symbols, optionally registering a `ticker,name` universe first.
    Symbols {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        universe: Option<PathBuf>,
    },
    /// Interactive chart session reading commands from stdin.
    View {
        #[arg(long)]
        db: PathBuf,
        /// Symbol selected on start.
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        debounce_ms: Option<u64>,
        #[arg(long)]
        batch_cap: Option<usize>,
        /// Also write logs under tmp/.
        #[arg(long)]
        log_file: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let persist = matches!(args.command, Command::View { log_file: true, .. });
    if let Some(path) = init_logging(&LogOptions {
        persist,
        default_filter: None,
    }) {
        info!(path = %path.display(), "logging to file");
    }

    match args.command {
        Command::Import {
            db,
            ticker,
            name,
            format,
            path,
        } => import(&db, &ticker, name.as_deref(), format, &path),
        Command::Symbols { db, universe } => list_symbols(&db, universe.as_deref()),
        Command::View {
            db,
            ticker,
            debounce_ms,
            batch_cap,
            ..
        } => {
            let config = refresh_config(debounce_ms, batch_cap)?;
            session::run(&db, ticker, config, std::io::stdin().lock(), std::io::stdout())?;
            Ok(())
        }
    }
}

fn refresh_config(debounce_ms: Option<u64>, batch_cap: Option<usize>) -> Result<RefreshConfig> {
    let mut config = RefreshConfig::default();
    if let Some(ms) = debounce_ms {
        config = config.with_debounce(Duration::from_millis(ms));
    }
    if let Some(cap) = batch_cap {
        if cap == 0 {
            bail!("--batch-cap must be positive");
        }
        config = config.with_batch_cap(cap);
    }
    Ok(config)
}

fn import(
    db: &Path,
    ticker: &str,
    name: Option<&str>,
    format: Option<InputFormat>,
    path: &Path,
) -> Result<()> {
    let format = format
        .or_else(|| detect_format(path))
        .ok_or_else(|| anyhow!("could not determine file format (use --format)"))?;
    let points =
        load_points(path, format).with_context(|| format!("failed to load {}", path.display()))?;
    if points.is_empty() {
        bail!("no data points loaded from {}", path.display());
    }

    let store = DuckDbStore::open_disk(db)?;
    store.upsert_symbol(&Symbol::new(ticker, name.unwrap_or(ticker)))?;
    store.write_points(ticker, &points)?;
    info!(ticker, points = points.len(), db = %db.display(), "imported");
    Ok(())
}

fn list_symbols(db: &Path, universe: Option<&Path>) -> Result<()> {
    let store = DuckDbStore::open_disk(db)?;
    if let Some(universe) = universe {
        import_universe(&store, universe)?;
    }
    for symbol in store.symbols()? {
        match store.latest_point(&symbol.ticker)? {
            Some(point) => println!(
                "{:<10} {:<30} {:>12.2} {}",
                symbol.ticker,
                symbol.name,
                to_major(point.close),
                point.timestamp.format(&Rfc3339)?,
            ),
            None => println!("{:<10} {:<30} {:>12}", symbol.ticker, symbol.name, "-"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let config = refresh_config(Some(120), Some(50)).unwrap();
        assert_eq!(config.debounce, Duration::from_millis(120));
        assert_eq!(config.batch_cap, 50);
        assert!(refresh_config(None, Some(0)).is_err());
    }

    #[test]
    fn view_flags_parse() {
        let args = Args::try_parse_from([
            "stockdata",
            "view",
            "--db",
            "data/stock.duckdb",
            "--ticker",
            "ACME",
            "--debounce-ms",
            "250",
            "--log-file",
        ])
        .unwrap();
        match args.command {
            Command::View {
                ticker,
                debounce_ms,
                log_file,
                ..
            } => {
                assert_eq!(ticker.as_deref(), Some("ACME"));
                assert_eq!(debounce_ms, Some(250));
                assert!(log_file);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
