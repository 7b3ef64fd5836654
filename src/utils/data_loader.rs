//! Data loading utilities

use crate::error::{Result, ThresholdError};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Supported tabular formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv { delimiter: u8 },
    Parquet,
    /// A single JSON array of objects
    Json,
    /// One JSON object per line
    JsonLines,
}

impl FileFormat {
    /// Detect the format from the file extension; CSV when unknown
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "tsv" => FileFormat::Csv { delimiter: b'\t' },
            "parquet" | "pq" => FileFormat::Parquet,
            "json" => FileFormat::Json,
            "jsonl" | "ndjson" => FileFormat::JsonLines,
            _ => FileFormat::Csv { delimiter: b',' },
        }
    }
}

/// Loads historical tender tables from disk
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used for CSV schema inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    fn open(path: &Path) -> Result<File> {
        File::open(path)
            .map_err(|e| ThresholdError::Data(format!("cannot open {}: {}", path.display(), e)))
    }

    /// Load a delimited text file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>, delimiter: u8) -> Result<DataFrame> {
        let file = Self::open(path.as_ref())?;

        let parse_opts = CsvParseOptions::default().with_separator(delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()?;
        Ok(df)
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let file = Self::open(path.as_ref())?;
        Ok(ParquetReader::new(file).finish()?)
    }

    /// Load a JSON array or JSON-lines file
    pub fn load_json(&self, path: impl AsRef<Path>, lines: bool) -> Result<DataFrame> {
        let file = Self::open(path.as_ref())?;
        let format = if lines { JsonFormat::JsonLines } else { JsonFormat::Json };
        Ok(JsonReader::new(file).with_json_format(format).finish()?)
    }

    /// Detect file format from extension and load
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let format = FileFormat::detect(path);

        let df = match format {
            FileFormat::Csv { delimiter } => self.load_csv(path, delimiter)?,
            FileFormat::Parquet => self.load_parquet(path)?,
            FileFormat::Json => self.load_json(path, false)?,
            FileFormat::JsonLines => self.load_json(path, true)?,
        };

        debug!(
            path = %path.display(),
            format = ?format,
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded data"
        );
        Ok(df)
    }
}
