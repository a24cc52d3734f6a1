use std::path::Path;

use clap::ValueEnum;
use stockdata_core::{DataPoint, LoadError, LoadOptions, load_csv, load_parquet};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Csv,
    Parquet,
}

pub fn detect_format(path: &Path) -> Option<InputFormat> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    match ext.as_str() {
        "csv" => Some(InputFormat::Csv),
        "parquet" | "parq" => Some(InputFormat::Parquet),
        _ => None,
    }
}

pub fn load_points(path: &Path, format: InputFormat) -> Result<Vec<DataPoint>, LoadError> {
    match format {
        InputFormat::Csv => load_csv(path, LoadOptions::default()),
        InputFormat::Parquet => load_parquet(path, LoadOptions::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(detect_format(Path::new("a/b.CSV")), Some(InputFormat::Csv));
        assert_eq!(detect_format(Path::new("x.parq")), Some(InputFormat::Parquet));
        assert_eq!(detect_format(Path::new("x.parquet")), Some(InputFormat::Parquet));
        assert_eq!(detect_format(Path::new("x.json")), None);
        assert_eq!(detect_format(Path::new("noext")), None);
    }
}
