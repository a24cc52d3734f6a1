use std::path::Path;
use std::sync::{Arc, Mutex};

use stockdata_core::{DuckDbStore, LoadError, StoreError, load_symbols};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Opens the on-disk store, wrapped for sharing between the data source and
/// the caller.
pub fn shared_store(path: impl AsRef<Path>) -> Result<Arc<Mutex<DuckDbStore>>, StoreError> {
    let store = DuckDbStore::open_disk(path)?;
    Ok(Arc::new(Mutex::new(store)))
}

/// Registers every symbol of a `ticker,name` universe file. Existing names are
/// overwritten.
pub fn import_universe(store: &DuckDbStore, path: impl AsRef<Path>) -> Result<usize, UniverseError> {
    let path = path.as_ref();
    let symbols = load_symbols(path)?;
    for symbol in &symbols {
        store.upsert_symbol(symbol)?;
    }
    info!(count = symbols.len(), path = %path.display(), "universe imported");
    Ok(symbols.len())
}
