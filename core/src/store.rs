use std::path::{Path, PathBuf};

use duckdb::{Connection, params, params_from_iter};
use time::OffsetDateTime;

use crate::{DataPoint, StoreError, Symbol, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Memory,
    Disk,
}

pub struct DuckDbStore {
    mode: StorageMode,
    disk_path: Option<PathBuf>,
    conn: Connection,
}

impl DuckDbStore {
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(None::<PathBuf>, StorageMode::Memory)
    }

    pub fn open_disk(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(Some(path), StorageMode::Disk)
    }

    pub fn open(path: Option<impl AsRef<Path>>, mode: StorageMode) -> Result<Self, StoreError> {
        let disk_path = path.map(|p| p.as_ref().to_path_buf());
        let conn = match mode {
            StorageMode::Memory => Connection::open_in_memory()?,
            StorageMode::Disk => {
                let path = disk_path.as_ref().ok_or(StoreError::MissingDiskPath)?;
                Connection::open(path)?
            }
        };
        init_schema(&conn)?;
        Ok(Self {
            mode,
            disk_path,
            conn,
        })
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn disk_path(&self) -> Option<&Path> {
        self.disk_path.as_deref()
    }

    pub fn upsert_symbol(&self, symbol: &Symbol) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO symbols(ticker, name) VALUES (?, ?)
             ON CONFLICT(ticker) DO UPDATE SET name = excluded.name",
            params![symbol.ticker, symbol.name],
        )?;
        Ok(())
    }

    pub fn symbol(&self, ticker: &str) -> Result<Option<Symbol>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT ticker, name FROM symbols WHERE ticker = ? LIMIT 1")?;
        let mut rows = stmt.query([ticker])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(Symbol {
                ticker: row.get(0)?,
                name: row.get(1)?,
            }));
        }
        Ok(None)
    }

    pub fn has_symbol(&self, ticker: &str) -> Result<bool, StoreError> {
        Ok(self.symbol(ticker)?.is_some())
    }

    pub fn symbols(&self) -> Result<Vec<Symbol>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT ticker, name FROM symbols ORDER BY ticker ASC")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(Symbol {
                ticker: row.get(0)?,
                name: row.get(1)?,
            });
        }
        Ok(out)
    }

    /// Replaces any existing rows for the same timestamps.
    pub fn write_points(&self, ticker: &str, points: &[DataPoint]) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO data_points (ticker, ts, open, high, low, close)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(ticker, ts) DO UPDATE SET
                open = excluded.open,
                high = excluded.high,
                low = excluded.low,
                close = excluded.close",
        )?;
        for point in points {
            stmt.execute(params![
                ticker,
                point.timestamp.unix_timestamp(),
                point.open,
                point.high,
                point.low,
                point.close
            ])?;
        }
        Ok(())
    }

    pub fn load_points(&self, ticker: &str, range: &TimeRange) -> Result<Vec<DataPoint>, StoreError> {
        let mut conditions = vec!["ticker = ?".to_string()];
        let mut params: Vec<duckdb::types::Value> = vec![ticker.to_string().into()];

        if let Some(start) = range.start() {
            conditions.push("ts >= ?".to_string());
            // stored timestamps are whole seconds
            let secs = start.unix_timestamp() + i64::from(start.nanosecond() > 0);
            params.push(secs.into());
        }
        if let Some(end) = range.end() {
            conditions.push("ts <= ?".to_string());
            params.push(end.unix_timestamp().into());
        }

        let query = format!(
            "SELECT ts, open, high, low, close
             FROM data_points
             WHERE {}
             ORDER BY ts ASC",
            conditions.join(" AND ")
        );
        let mut stmt = self.conn.prepare(&query)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(row_to_point(row)?);
        }
        Ok(result)
    }

    pub fn latest_point(&self, ticker: &str) -> Result<Option<DataPoint>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ts, open, high, low, close
             FROM data_points
             WHERE ticker = ?
             ORDER BY ts DESC
             LIMIT 1",
        )?;
        let mut rows = stmt.query([ticker])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_point(row)?)),
            None => Ok(None),
        }
    }
}

fn row_to_point(row: &duckdb::Row<'_>) -> Result<DataPoint, StoreError> {
    let ts: i64 = row.get(0)?;
    let timestamp = OffsetDateTime::from_unix_timestamp(ts).map_err(|_| StoreError::Timestamp(ts))?;
    Ok(DataPoint {
        timestamp,
        open: row.get(1)?,
        high: row.get(2)?,
        low: row.get(3)?,
        close: row.get(4)?,
    })
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS symbols (
            ticker TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS data_points (
            ticker TEXT NOT NULL,
            ts BIGINT NOT NULL,
            open BIGINT NOT NULL,
            high BIGINT NOT NULL,
            low BIGINT NOT NULL,
            close BIGINT NOT NULL,
            PRIMARY KEY (ticker, ts)
        );
        ",
    )?;
    Ok(())
}
