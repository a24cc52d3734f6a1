use std::fs::{OpenOptions, create_dir_all};
use std::io::LineWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const LOG_DIR: &str = "tmp";
const LOG_BASENAME: &str = "chart_refresh";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Also persist log lines to `tmp/chart_refresh_<ms>_pid<pid>.log`.
    pub persist: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: Option<String>,
}

pub fn log_path() -> PathBuf {
    let ts_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let pid = std::process::id();
    let filename = format!("{LOG_BASENAME}_{ts_ms}_pid{pid}.log");
    Path::new(LOG_DIR).join(filename)
}

fn open_log_file(path: &Path) -> std::io::Result<LineWriter<std::fs::File>> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    Ok(LineWriter::new(file))
}

/// Installs the global subscriber. Returns the log file path when one was
/// opened. Calling it twice is harmless; the first subscriber wins.
pub fn init_logging(options: &LogOptions) -> Option<PathBuf> {
    let default_filter = options.default_filter.as_deref().unwrap_or("info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file = if options.persist {
        let path = log_path();
        match open_log_file(&path) {
            Ok(writer) => Some((path, writer)),
            Err(err) => {
                eprintln!("[log] failed to open log file {:?}: {err}", path);
                None
            }
        }
    } else {
        None
    };

    match file {
        Some((path, writer)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stdout.and(Mutex::new(writer)))
                .with_ansi(false)
                .try_init();
            Some(path)
        }
        None => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_is_under_tmp_and_tagged_with_pid() {
        let path = log_path();
        assert!(path.starts_with(LOG_DIR));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(LOG_BASENAME));
        assert!(name.ends_with(&format!("_pid{}.log", std::process::id())));
    }
}
