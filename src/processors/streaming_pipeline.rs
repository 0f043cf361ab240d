use crate::error::Result;
use crate::models::{chronological, S4Record};
use crate::processors::epoch_transform::{EpochTransform, SkipCounts};
use crate::processors::integrity_checker::{IntegrityChecker, IntegrityReport};
use crate::processors::window_aggregator::WindowAggregator;
use crate::readers::{ObservationReader, ObservationSource};
use crate::settings::PipelineSettings;
use crate::utils::progress::ProgressReporter;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Chunk-by-chunk driver: read → transform → aggregate → emit.
///
/// Every run owns a fresh [`WindowAggregator`]; a pipeline value can be reused
/// for any number of sources.
pub struct StreamingPipeline {
    transform: EpochTransform,
    checker: IntegrityChecker,
    cancel: Option<Arc<AtomicBool>>,
}

impl StreamingPipeline {
    pub fn new() -> Self {
        Self {
            transform: EpochTransform::new(),
            checker: IntegrityChecker::new(),
            cancel: None,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Result<Self> {
        settings.check()?;

        Ok(Self {
            transform: EpochTransform::from_settings(settings)?,
            checker: IntegrityChecker::with_threshold(settings.scintillation_threshold),
            cancel: None,
        })
    }

    /// Stop pulling chunks once `flag` is raised; whatever is buffered is still finalized.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn checker(&self) -> &IntegrityChecker {
        &self.checker
    }

    /// All S4 records for `source`, in chronological order.
    pub fn run<S: ObservationSource>(&self, source: S) -> Result<Vec<S4Record>> {
        self.run_with_report(source, None).map(|(records, _)| records)
    }

    pub fn run_with_report<S: ObservationSource>(
        &self,
        mut source: S,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<S4Record>, IntegrityReport)> {
        let mut aggregator = WindowAggregator::new();
        let mut records = Vec::new();
        let mut skipped = SkipCounts::default();
        let mut rows_read: u64 = 0;
        let mut chunks: u64 = 0;
        let mut cancelled = false;

        loop {
            if self.is_cancelled() {
                warn!(chunks, "Cancellation requested, finalizing partial result");
                cancelled = true;
                break;
            }

            let Some(chunk) = source.next_chunk()? else {
                break;
            };

            rows_read += chunk.len() as u64;
            chunks += 1;

            let samples = self.transform.apply_chunk(&chunk, &mut skipped)?;
            records.extend(aggregator.push_chunk(&samples)?);

            if let Some(p) = progress {
                p.increment(chunk.len() as u64);
                p.set_message(&format!(
                    "Chunk {}: {} windows closed, {} buffered",
                    chunks,
                    records.len(),
                    aggregator.boundary().len()
                ));
            }
        }

        if !aggregator.boundary().is_empty() {
            debug!(
                closed_windows = aggregator.windows_emitted(),
                buffered_windows = aggregator.boundary().len(),
                buffered_samples = aggregator.boundary().sample_count(),
                "Flushing boundary buffer"
            );
        }
        records.extend(aggregator.finish());
        records.sort_by(chronological);

        let mut report = self.checker.check_records(&records, rows_read, skipped);
        report.cancelled = cancelled;

        info!(
            chunks,
            rows = rows_read,
            skipped = skipped.total(),
            windows = records.len(),
            "Pipeline run complete"
        );

        Ok((records, report))
    }

    /// Run over a converted observation file.
    pub fn process_file(
        &self,
        path: &Path,
        settings: &PipelineSettings,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<S4Record>, IntegrityReport)> {
        info!(path = %path.display(), "Processing observation file");
        let mut reader = ObservationReader::open(path, settings)?;
        let result = self.run_with_report(&mut reader, progress)?;

        debug!(
            lines = reader.line_count(),
            ignored = reader.ignored_lines(),
            "Finished reading observation file"
        );
        Ok(result)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl Default for StreamingPipeline {
    fn default() -> Self {
        Self::new()
    }
}
