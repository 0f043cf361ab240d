pub mod sbf_converter;

pub use sbf_converter::{ConversionWorkspace, SbfConverter};

use crate::error::{ProcessingError, Result};
use std::path::{Path, PathBuf};

/// Raw receiver files in `dir` whose extension is `extension`, sorted by name.
pub fn find_raw_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ProcessingError::MissingData(format!(
            "Input directory not found: {}",
            dir.display()
        )));
    }

    let extension = extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == extension)
        })
        .collect();

    files.sort();
    Ok(files)
}
