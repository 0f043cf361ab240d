use crate::error::{ProcessingError, Result};
use crate::utils::constants::{CONVERTED_FILE_SUFFIX, DEFAULT_CONVERTER_BINARY};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs the receiver's binary-to-text tool on raw receiver files.
///
/// Flags are fixed: measurement blocks only (`-m`), blocks with invalid time
/// stamps excluded (`-E`).
#[derive(Debug, Clone)]
pub struct SbfConverter {
    binary: PathBuf,
}

impl SbfConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-f".into(),
            input.as_os_str().to_owned(),
            "-m".into(),
            "-E".into(),
            "-o".into(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Convert `input` into `output_dir`, returning the path of the text file.
    pub async fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        if !input.is_file() {
            return Err(self.failure(input, "input file not found".to_string()));
        }

        let file_name = input
            .file_name()
            .and_then(|f| f.to_str())
            .ok_or_else(|| self.failure(input, "invalid input file name".to_string()))?;
        let output = output_dir.join(format!("{}{}", file_name, CONVERTED_FILE_SUFFIX));

        debug!(binary = %self.binary.display(), input = %input.display(), "Running converter");
        let result = Command::new(&self.binary)
            .args(self.command_args(input, &output))
            .output()
            .await
            .map_err(|e| {
                self.failure(
                    input,
                    format!("could not launch {}: {}", self.binary.display(), e),
                )
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(self.failure(
                input,
                format!(
                    "{} exited with {}: {}",
                    self.binary.display(),
                    result.status,
                    stderr.trim()
                ),
            ));
        }

        match tokio::fs::metadata(&output).await {
            Ok(metadata) if metadata.len() > 0 => {
                info!(input = %input.display(), output = %output.display(), "Converted receiver file");
                Ok(output)
            }
            _ => Err(self.failure(input, "converter produced no output".to_string())),
        }
    }

    fn failure(&self, input: &Path, reason: String) -> ProcessingError {
        ProcessingError::ConversionFailed {
            input: input.to_path_buf(),
            reason,
        }
    }
}

impl Default for SbfConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER_BINARY)
    }
}

/// Scratch directory for converted text files; removed on drop.
pub struct ConversionWorkspace {
    temp_dir: TempDir,
    converter: SbfConverter,
}

impl ConversionWorkspace {
    pub fn new(converter: SbfConverter) -> Result<Self> {
        let temp_dir = TempDir::new().map_err(|e| {
            ProcessingError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create temporary directory: {}", e),
            ))
        })?;

        Ok(Self {
            temp_dir,
            converter,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub async fn convert(&self, input: &Path) -> Result<PathBuf> {
        self.converter.convert(input, self.temp_dir.path()).await
    }
}
