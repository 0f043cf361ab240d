/// GPS time reference: 1980-01-06T00:00:00 UTC as Unix milliseconds
pub const GPS_EPOCH_UNIX_MILLIS: i64 = 315_964_800_000;
pub const SECONDS_PER_GPS_WEEK: f64 = 604_800.0;

/// Satellite code sentinels
pub const SVID_NOT_AVAILABLE: &str = "NA";
pub const SVID_UNKNOWN: &str = "Unknown SVID";

/// Converter output layout (zero-based columns)
pub const SVID_COLUMN: usize = 0;
pub const TIME_COLUMN: usize = 1;
pub const PRIMARY_SNR_COLUMN: usize = 4;
pub const SECONDARY_SNR_COLUMN: usize = 7;

/// Value written by the converter when an observable is unavailable
pub const CONVERTER_NOT_VALID: f64 = -2.0e10;
pub const NOT_VALID_THRESHOLD: f64 = -1.0e10;

/// Scintillation
pub const SCINTILLATION_THRESHOLD: f64 = 0.3;

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_HEADER_ROWS: usize = 0;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Receiver files and converter
pub const DEFAULT_RAW_EXTENSION: &str = "24_";
pub const DEFAULT_CONVERTER_BINARY: &str = "sbf2asc";
pub const CONVERTED_FILE_SUFFIX: &str = "_measurements.txt";

/// Environment prefix for settings overrides
pub const SETTINGS_ENV_PREFIX: &str = "S4";

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
