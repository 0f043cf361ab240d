pub mod epoch_transform;
pub mod integrity_checker;
pub mod streaming_pipeline;
pub mod window_aggregator;

pub use epoch_transform::{EpochTransform, SkipCounts};
pub use integrity_checker::{IntegrityChecker, IntegrityReport, SatelliteStatistics, ScintillationEvent};
pub use streaming_pipeline::StreamingPipeline;
pub use window_aggregator::{BoundaryBuffer, WindowAggregator};
