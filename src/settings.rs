use crate::error::{ProcessingError, Result};
use crate::models::SatelliteCode;
use crate::utils::constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_HEADER_ROWS, PRIMARY_SNR_COLUMN, SCINTILLATION_THRESHOLD,
    SECONDARY_SNR_COLUMN, SETTINGS_ENV_PREFIX, SVID_COLUMN, TIME_COLUMN,
};
use clap::ValueEnum;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Whitespace,
    Comma,
}

/// Which C/N0 column of the converter output feeds the S4 computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// L1CA / E1 / B1I
    #[default]
    Primary,
    /// L2P / L2CA / E5a / B2I
    Secondary,
}

impl Signal {
    pub fn snr_column(&self) -> usize {
        match self {
            Signal::Primary => PRIMARY_SNR_COLUMN,
            Signal::Secondary => SECONDARY_SNR_COLUMN,
        }
    }
}

/// What to do with rows whose SNR is unavailable, non-finite or not above 0 dB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InvalidSnrPolicy {
    #[default]
    Skip,
    /// Keep the row as a NaN sample; the window's S4 becomes NaN.
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineSettings {
    #[validate(range(min = 1))]
    pub chunk_size: usize,

    pub header_rows: usize,

    pub delimiter: Delimiter,

    pub svid_column: usize,

    pub time_column: usize,

    /// Explicit SNR column; overrides `signal` when set.
    pub snr_column: Option<usize>,

    pub signal: Signal,

    /// Added as `week * 604800` seconds when the time column is a true time-of-week.
    #[validate(range(max = 9999))]
    pub gps_week: Option<u32>,

    pub invalid_snr: InvalidSnrPolicy,

    /// Canonical codes to keep (e.g. "G01"); empty keeps everything.
    pub satellites: Vec<String>,

    #[validate(range(min = 0.0))]
    pub scintillation_threshold: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            header_rows: DEFAULT_HEADER_ROWS,
            delimiter: Delimiter::default(),
            svid_column: SVID_COLUMN,
            time_column: TIME_COLUMN,
            snr_column: None,
            signal: Signal::default(),
            gps_week: None,
            invalid_snr: InvalidSnrPolicy::default(),
            satellites: Vec::new(),
            scintillation_threshold: SCINTILLATION_THRESHOLD,
        }
    }
}

impl PipelineSettings {
    /// Defaults, then the optional settings file, then `S4_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(ProcessingError::Config(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(SETTINGS_ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("satellites"),
        );

        let settings: PipelineSettings = builder.build()?.try_deserialize()?;
        settings.check()?;
        Ok(settings)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_satellites(mut self, satellites: Vec<String>) -> Self {
        self.satellites = satellites;
        self
    }

    /// Field validation plus the checks `validator` cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        self.satellite_filter()?;

        let columns = [self.svid_column, self.time_column, self.snr_column()];
        if columns[0] == columns[1] || columns[0] == columns[2] || columns[1] == columns[2] {
            return Err(ProcessingError::Config(format!(
                "SVID, time and SNR columns must be distinct, got {:?}",
                columns
            )));
        }

        Ok(())
    }

    pub fn snr_column(&self) -> usize {
        self.snr_column.unwrap_or_else(|| self.signal.snr_column())
    }

    /// Number of columns a row needs to be considered a measurement row.
    pub fn required_columns(&self) -> usize {
        self.svid_column.max(self.time_column).max(self.snr_column()) + 1
    }

    pub fn satellite_filter(&self) -> Result<Option<BTreeSet<SatelliteCode>>> {
        if self.satellites.is_empty() {
            return Ok(None);
        }

        self.satellites
            .iter()
            .map(|s| s.parse::<SatelliteCode>())
            .collect::<Result<BTreeSet<_>>>()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn settings_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = PipelineSettings::default();
        assert!(settings.check().is_ok());
        assert_eq!(settings.snr_column(), PRIMARY_SNR_COLUMN);
        assert_eq!(settings.required_columns(), PRIMARY_SNR_COLUMN + 1);
    }

    #[test]
    fn test_secondary_signal_column() {
        let settings = PipelineSettings::default().with_signal(Signal::Secondary);
        assert_eq!(settings.snr_column(), SECONDARY_SNR_COLUMN);
    }

    #[test]
    fn test_load_from_file() {
        let file = settings_file(
            "chunk_size = 250\nheader_rows = 2\ndelimiter = \"comma\"\ninvalid_snr = \"propagate\"\nsatellites = [\"G01\", \"E11\"]\n",
        );

        let settings = PipelineSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.chunk_size, 250);
        assert_eq!(settings.header_rows, 2);
        assert_eq!(settings.delimiter, Delimiter::Comma);
        assert_eq!(settings.invalid_snr, InvalidSnrPolicy::Propagate);

        let filter = settings.satellite_filter().unwrap().unwrap();
        assert!(filter.contains(&"E11".parse().unwrap()));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let file = settings_file("chunk_size = 0\n");
        assert!(PipelineSettings::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_rejected() {
        let result = PipelineSettings::load(Some(Path::new("/nonexistent/s4.toml")));
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_overlapping_columns_rejected() {
        let mut settings = PipelineSettings::default();
        settings.snr_column = Some(settings.time_column);
        assert!(settings.check().is_err());
    }

    #[test]
    fn test_bad_satellite_filter_rejected() {
        let settings = PipelineSettings::default().with_satellites(vec!["Z99".to_string()]);
        assert!(settings.check().is_err());
    }
}
