use std::path::Path;

use csv::StringRecord;

use crate::{LoadError, Symbol};

/// Reads a `ticker,name` universe file. Header names are matched
/// case-insensitively and `symbol` is accepted in place of `ticker`.
/// Rows without a ticker are skipped.
pub fn load_symbols(path: impl AsRef<Path>) -> Result<Vec<Symbol>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let headers = reader.headers()?.clone();

    let mut out = Vec::new();
    for record in reader.records() {
        if let Some(symbol) = record_to_symbol(&headers, &record?) {
            out.push(symbol);
        }
    }
    Ok(out)
}

fn record_to_symbol(headers: &StringRecord, record: &StringRecord) -> Option<Symbol> {
    let get = |keys: &[&str]| -> String {
        headers
            .iter()
            .position(|h| keys.iter().any(|k| h.eq_ignore_ascii_case(k)))
            .and_then(|idx| record.get(idx))
            .unwrap_or_default()
            .trim_matches('"')
            .trim()
            .to_string()
    };

    let ticker = get(&["ticker", "symbol"]);
    if ticker.is_empty() {
        return None;
    }
    let name = get(&["name"]);
    let name = if name.is_empty() { ticker.clone() } else { name };
    Some(Symbol { ticker, name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path() -> std::path::PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("stockdata-symbols-{nonce}.csv"))
    }

    #[test]
    fn reads_universe_file() {
        let path = temp_path();
        fs::write(
            &path,
            "Symbol,Name,Exchange\nACME,\"Acme Corp\",NYSE\n,Missing Ticker,NYSE\nBOLT,,NASDAQ\n",
        )
        .unwrap();

        let symbols = load_symbols(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(
            symbols,
            vec![Symbol::new("ACME", "Acme Corp"), Symbol::new("BOLT", "BOLT")]
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_symbols("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }
}
