//! Table I/O by file extension
//!
//! `.parquet` / `.pq` are read and written as Parquet (Zstd), anything else
//! as CSV with a header row.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("parquet") | Some("pq") => TableFormat::Parquet,
            _ => TableFormat::Csv,
        }
    }
}

/// Read a CSV or Parquet table; `null_values` apply to CSV only
pub fn read_table(path: &Path, null_values: &[String]) -> Result<DataFrame> {
    match TableFormat::from_path(path) {
        TableFormat::Parquet => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to scan parquet: {:?}", path))?
            .collect()
            .with_context(|| format!("Failed to load parquet: {:?}", path)),
        TableFormat::Csv => {
            let nulls: Vec<PlSmallStr> = null_values.iter().map(|s| s.as_str().into()).collect();
            let parse_options = CsvParseOptions::default()
                .with_null_values(Some(NullValues::AllColumns(nulls)));

            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(None) // Scan entire file
                .with_parse_options(parse_options)
                .try_into_reader_with_file_path(Some(path.into()))
                .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
                .finish()
                .with_context(|| format!("Failed to load CSV: {:?}", path))
        }
    }
}

/// Write a table, creating parent directories as needed
pub fn write_table(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    match TableFormat::from_path(path) {
        TableFormat::Parquet => {
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Zstd(None))
                .finish(df)
                .with_context(|| format!("Failed to write parquet: {:?}", path))?;
        }
        TableFormat::Csv => {
            let mut file = file;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(df)
                .with_context(|| format!("Failed to write CSV: {:?}", path))?;
        }
    }

    tracing::debug!("Wrote {} rows × {} columns to {:?}", df.height(), df.width(), path);
    Ok(())
}
