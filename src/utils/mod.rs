pub mod constants;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{generate_default_output_filename, is_parquet_path, output_filename_for};
pub use progress::ProgressReporter;
