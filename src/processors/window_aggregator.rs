use crate::error::{ProcessingError, Result};
use crate::models::{chronological, S4Record, Sample, WindowAccumulator, WindowKey};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-minute partial sums carried between chunks.
///
/// Holds the windows at the earliest and latest minute of the last combined
/// chunk, which later chunks may still extend.
#[derive(Debug, Default)]
pub struct BoundaryBuffer {
    windows: BTreeMap<WindowKey, WindowAccumulator>,
}

impl BoundaryBuffer {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn sample_count(&self) -> u64 {
        self.windows.values().map(|acc| acc.count).sum()
    }

    pub fn minutes(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        minute_span(&self.windows)
    }
}

/// Streaming per-satellite, per-minute S4 aggregation.
///
/// Samples must arrive in non-decreasing time order within each chunk as well
/// as across chunks. Converter output is time-sorted, so any decrease is
/// rejected with `OutOfOrder`. Each chunk is merged with the boundary buffer;
/// windows strictly between the earliest and latest minute of the combined set
/// are closed and emitted, the rest are retained.
#[derive(Debug, Default)]
pub struct WindowAggregator {
    boundary: BoundaryBuffer,
    watermark: Option<DateTime<Utc>>,
    samples_seen: u64,
    windows_emitted: u64,
}

impl WindowAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boundary(&self) -> &BoundaryBuffer {
        &self.boundary
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted
    }

    /// Merge one chunk and return the windows it closes, in chronological order.
    pub fn push_chunk(&mut self, samples: &[Sample]) -> Result<Vec<S4Record>> {
        self.check_order(samples)?;

        let mut combined = std::mem::take(&mut self.boundary.windows);
        for sample in samples {
            combined
                .entry(sample.window_key())
                .or_default()
                .push(sample.linear_snr);
        }
        self.samples_seen += samples.len() as u64;

        let Some((first_minute, last_minute)) = minute_span(&combined) else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for (key, acc) in combined {
            if key.minute > first_minute && key.minute < last_minute {
                records.push(acc.finalize(key));
            } else {
                self.boundary.windows.insert(key, acc);
            }
        }
        records.sort_by(chronological);
        self.windows_emitted += records.len() as u64;

        debug!(
            samples = samples.len(),
            emitted = records.len(),
            retained = self.boundary.len(),
            %first_minute,
            %last_minute,
            "Aggregated chunk"
        );

        Ok(records)
    }

    /// Close every remaining window. Consumes the aggregator so nothing is finalized twice.
    pub fn finish(mut self) -> Vec<S4Record> {
        let mut records: Vec<S4Record> = std::mem::take(&mut self.boundary.windows)
            .into_iter()
            .map(|(key, acc)| acc.finalize(key))
            .collect();
        records.sort_by(chronological);

        debug!(emitted = records.len(), "Flushed boundary buffer");
        records
    }

    fn check_order(&mut self, samples: &[Sample]) -> Result<()> {
        let mut watermark = self.watermark;
        for sample in samples {
            if let Some(previous) = watermark {
                if sample.timestamp < previous {
                    return Err(ProcessingError::OutOfOrder {
                        previous,
                        found: sample.timestamp,
                    });
                }
            }
            watermark = Some(sample.timestamp);
        }
        self.watermark = watermark;
        Ok(())
    }
}

fn minute_span(
    windows: &BTreeMap<WindowKey, WindowAccumulator>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = windows.keys().map(|key| key.minute).min()?;
    let last = windows.keys().map(|key| key.minute).max()?;
    Some((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::observation::{db_to_linear, gps_seconds_to_utc};
    use crate::models::{decode, RawObservation};

    fn sample(svid: i64, seconds: f64, snr_db: f64) -> Sample {
        Sample::from_observation(&RawObservation::new(svid, seconds, snr_db)).unwrap()
    }

    fn run_chunks(samples: &[Sample], chunk_size: usize) -> Vec<S4Record> {
        let mut aggregator = WindowAggregator::new();
        let mut records = Vec::new();
        for chunk in samples.chunks(chunk_size) {
            records.extend(aggregator.push_chunk(chunk).unwrap());
        }
        records.extend(aggregator.finish());
        records.sort_by(chronological);
        records
    }

    /// Deterministic pseudo-random SNR series for several satellites.
    fn synthetic_samples(minutes: u32) -> Vec<Sample> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut samples = Vec::new();
        for second in 0..(minutes * 60) {
            for svid in [3, 45, 75, 150] {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                if state >> 61 == 0 {
                    // drop some epochs so windows have uneven counts
                    continue;
                }
                let noise = (state >> 33) as f64 / (1u64 << 31) as f64;
                samples.push(sample(svid, 1_000.0 + second as f64, 35.0 + 10.0 * noise));
            }
        }
        samples
    }

    #[test]
    fn test_concrete_scenario() {
        let samples = vec![sample(1, 0.0, 40.0), sample(1, 30.0, 43.0), sample(1, 65.0, 40.0)];

        for chunk_size in [1, 2, 3] {
            let records = run_chunks(&samples, chunk_size);
            assert_eq!(records.len(), 2, "chunk size {}", chunk_size);

            assert_eq!(records[0].satellite.to_string(), "G01");
            assert_eq!(records[0].minute, gps_seconds_to_utc(0.0).unwrap());
            assert_eq!(records[0].sample_count, 2);
            let a = db_to_linear(40.0);
            let b = db_to_linear(43.0);
            let expected = ((b - a) / 2.0) / ((a + b) / 2.0);
            assert!((records[0].s4 - expected).abs() < 1e-12);

            assert_eq!(records[1].minute, gps_seconds_to_utc(60.0).unwrap());
            assert_eq!(records[1].sample_count, 1);
            assert_eq!(records[1].s4, 0.0);
        }
    }

    #[test]
    fn test_single_minute_chunk_is_all_boundary() {
        let mut aggregator = WindowAggregator::new();
        let chunk = vec![sample(1, 0.0, 40.0), sample(2, 10.0, 41.0), sample(1, 59.0, 42.0)];

        let records = aggregator.push_chunk(&chunk).unwrap();
        assert!(records.is_empty());
        assert!(!aggregator.boundary().is_empty());
        assert_eq!(aggregator.boundary().len(), 2);
        assert_eq!(aggregator.boundary().sample_count(), 3);
    }

    #[test]
    fn test_interior_minutes_are_emitted() {
        let mut aggregator = WindowAggregator::new();
        let chunk: Vec<Sample> = (0..4).map(|m| sample(1, m as f64 * 60.0 + 5.0, 40.0)).collect();

        let records = aggregator.push_chunk(&chunk).unwrap();
        assert_eq!(aggregator.windows_emitted(), 2);
        let minutes: Vec<_> = records.iter().map(|r| r.minute).collect();
        assert_eq!(
            minutes,
            vec![gps_seconds_to_utc(60.0).unwrap(), gps_seconds_to_utc(120.0).unwrap()]
        );

        let (first, last) = aggregator.boundary().minutes().unwrap();
        assert_eq!(first, gps_seconds_to_utc(0.0).unwrap());
        assert_eq!(last, gps_seconds_to_utc(180.0).unwrap());
    }

    #[test]
    fn test_boundary_window_completed_by_next_chunk() {
        let mut aggregator = WindowAggregator::new();
        let first = vec![sample(1, 0.0, 40.0), sample(1, 60.0, 40.0), sample(1, 120.0, 40.0)];
        let second = vec![sample(1, 150.0, 43.0), sample(1, 200.0, 40.0)];

        aggregator.push_chunk(&first).unwrap();
        let records = aggregator.push_chunk(&second).unwrap();

        // minute 2 gained a sample from the second chunk before closing
        let minute_two = records
            .iter()
            .find(|r| r.minute == gps_seconds_to_utc(120.0).unwrap())
            .unwrap();
        assert_eq!(minute_two.sample_count, 2);
        assert!(minute_two.s4 > 0.0);
    }

    #[test]
    fn test_chunk_invariance() {
        let samples = synthetic_samples(7);
        let reference = run_chunks(&samples, samples.len());

        for chunk_size in [1, 2, 7, 61, 240, 1_000] {
            let records = run_chunks(&samples, chunk_size);
            assert_eq!(records.len(), reference.len(), "chunk size {}", chunk_size);

            for (got, want) in records.iter().zip(&reference) {
                assert_eq!(got.satellite, want.satellite);
                assert_eq!(got.minute, want.minute);
                assert_eq!(got.sample_count, want.sample_count);
                assert!((got.s4 - want.s4).abs() < 1e-9, "chunk size {}", chunk_size);
            }
        }
    }

    #[test]
    fn test_every_sample_counted_once() {
        let samples = synthetic_samples(5);
        for chunk_size in [3, 97, 500] {
            let records = run_chunks(&samples, chunk_size);
            let total: u64 = records.iter().map(|r| r.sample_count).sum();
            assert_eq!(total, samples.len() as u64);

            let mut keys: Vec<_> = records.iter().map(|r| (r.satellite, r.minute)).collect();
            keys.dedup();
            assert_eq!(keys.len(), records.len());
        }
    }

    #[test]
    fn test_out_of_order_rejected() {
        let mut aggregator = WindowAggregator::new();
        aggregator.push_chunk(&[sample(1, 120.0, 40.0)]).unwrap();

        let err = aggregator.push_chunk(&[sample(1, 30.0, 40.0)]).unwrap_err();
        assert!(matches!(err, ProcessingError::OutOfOrder { .. }));
        assert_eq!(aggregator.samples_seen(), 1);
    }

    #[test]
    fn test_decrease_within_chunk_rejected() {
        let mut aggregator = WindowAggregator::new();
        let chunk = vec![sample(1, 10.0, 40.0), sample(2, 10.0, 40.0), sample(1, 9.5, 40.0)];

        let err = aggregator.push_chunk(&chunk).unwrap_err();
        assert!(matches!(err, ProcessingError::OutOfOrder { .. }));
        assert!(aggregator.boundary().is_empty());
    }

    #[test]
    fn test_empty_input() {
        let mut aggregator = WindowAggregator::new();
        assert!(aggregator.push_chunk(&[]).unwrap().is_empty());
        assert!(aggregator.boundary().is_empty());
        assert_eq!(aggregator.windows_emitted(), 0);
        assert!(aggregator.finish().is_empty());
    }

    #[test]
    fn test_sentinel_satellites_are_grouped() {
        let samples = vec![sample(62, 0.0, 40.0), sample(300, 1.0, 40.0), sample(301, 2.0, 42.0)];
        let records = run_chunks(&samples, 2);

        assert_eq!(records.len(), 2);
        let unknown = records
            .iter()
            .find(|r| r.satellite == decode(300))
            .unwrap();
        assert_eq!(unknown.sample_count, 2);
    }
}
