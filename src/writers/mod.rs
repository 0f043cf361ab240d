pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::CsvWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};

use crate::error::Result;
use crate::models::S4Record;
use crate::utils::filename::is_parquet_path;
use std::path::Path;

/// Write `records` as Parquet or CSV depending on the output extension.
pub fn write_table(
    records: &[S4Record],
    path: &Path,
    compression: &str,
    batch_size: usize,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    if is_parquet_path(path) {
        ParquetWriter::new()
            .with_compression(compression)?
            .write_records(records, path, batch_size)
    } else {
        CsvWriter::new().write_records(records, path)
    }
}
