pub mod cli;
pub mod converter;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod settings;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
pub use models::{decode, S4Record, SatelliteCode};
pub use processors::StreamingPipeline;
pub use settings::PipelineSettings;
