use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Default output path: output/s4-{YYMMDD}.csv
pub fn generate_default_output_filename() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let filename = format!("s4-{:02}{:02}{:02}.csv", year, now.month(), now.day());
    PathBuf::from("output").join(filename)
}

/// Output path for one receiver file processed in directory mode: {stem}_s4.{extension}
pub fn output_filename_for(input: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_name()
        .and_then(|f| f.to_str())
        .map(|name| name.replace('.', "_"))
        .unwrap_or_else(|| "observations".to_string());
    output_dir.join(format!("{}_s4.{}", stem, extension))
}

/// True when the path names a Parquet file.
pub fn is_parquet_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"))
}
