use crate::models::{S4Record, SatelliteCode};
use crate::processors::epoch_transform::SkipCounts;
use crate::utils::constants::SCINTILLATION_THRESHOLD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub rows_read: u64,
    pub skipped: SkipCounts,
    pub samples_aggregated: u64,
    pub total_windows: usize,
    pub degenerate_windows: usize,
    pub nan_windows: usize,
    pub sentinel_samples: u64,
    pub cancelled: bool,
    pub satellite_statistics: BTreeMap<SatelliteCode, SatelliteStatistics>,
    pub scintillation_events: Vec<ScintillationEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScintillationEvent {
    pub satellite: SatelliteCode,
    pub minute: DateTime<Utc>,
    pub s4: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SatelliteStatistics {
    pub windows: usize,
    pub samples: u64,
    pub min_s4: Option<f64>,
    pub max_s4: Option<f64>,
    pub mean_s4: Option<f64>,
    /// Consecutive windows more than one minute apart
    pub tracking_gaps: usize,
    #[serde(skip)]
    s4_sum: f64,
    #[serde(skip)]
    s4_count: usize,
}

impl SatelliteStatistics {
    fn record(&mut self, record: &S4Record) {
        self.windows += 1;
        self.samples += record.sample_count;

        if record.s4.is_finite() {
            self.min_s4 = Some(self.min_s4.map_or(record.s4, |s| s.min(record.s4)));
            self.max_s4 = Some(self.max_s4.map_or(record.s4, |s| s.max(record.s4)));
            self.s4_sum += record.s4;
            self.s4_count += 1;
            self.mean_s4 = Some(self.s4_sum / self.s4_count as f64);
        }
    }
}

pub struct IntegrityChecker {
    scintillation_threshold: f64,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            scintillation_threshold: SCINTILLATION_THRESHOLD,
        }
    }

    pub fn with_threshold(scintillation_threshold: f64) -> Self {
        Self {
            scintillation_threshold,
        }
    }

    /// Build the report for one pipeline run. `records` must be in chronological order.
    pub fn check_records(
        &self,
        records: &[S4Record],
        rows_read: u64,
        skipped: SkipCounts,
    ) -> IntegrityReport {
        let mut report = IntegrityReport {
            rows_read,
            skipped,
            total_windows: records.len(),
            ..Default::default()
        };

        let mut last_minute: BTreeMap<SatelliteCode, DateTime<Utc>> = BTreeMap::new();

        for record in records {
            report.samples_aggregated += record.sample_count;

            if record.is_degenerate() {
                report.degenerate_windows += 1;
            }
            if record.s4.is_nan() {
                report.nan_windows += 1;
            }
            if !record.satellite.is_slot() {
                report.sentinel_samples += record.sample_count;
            }
            if record.is_scintillating(self.scintillation_threshold) {
                report.scintillation_events.push(ScintillationEvent {
                    satellite: record.satellite,
                    minute: record.minute,
                    s4: record.s4,
                });
            }

            let stats = report
                .satellite_statistics
                .entry(record.satellite)
                .or_default();
            stats.record(record);

            if let Some(previous) = last_minute.insert(record.satellite, record.minute) {
                if (record.minute - previous).num_minutes() > 1 {
                    stats.tracking_gaps += 1;
                }
            }
        }

        report
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== S4 Processing Report ===\n");
        summary.push_str(&format!("Rows Read: {}\n", report.rows_read));
        summary.push_str(&format!(
            "Rows Skipped: {} (invalid SNR: {}, filtered: {})\n",
            report.skipped.total(),
            report.skipped.invalid_snr,
            report.skipped.filtered_satellite
        ));
        summary.push_str(&format!("Samples Aggregated: {}\n", report.samples_aggregated));
        summary.push_str(&format!("S4 Windows: {}\n", report.total_windows));
        summary.push_str(&format!(
            "Single-sample Windows: {}\n",
            report.degenerate_windows
        ));
        summary.push_str(&format!("NaN Windows: {}\n", report.nan_windows));
        summary.push_str(&format!(
            "Samples Without Satellite Slot: {}\n",
            report.sentinel_samples
        ));
        summary.push_str(&format!(
            "Satellites: {}\n",
            report.satellite_statistics.len()
        ));

        if report.cancelled {
            summary.push_str("Run was cancelled: results are partial\n");
        }

        summary.push_str(&format!(
            "\nScintillation Events (S4 > {}): {}\n",
            self.scintillation_threshold,
            report.scintillation_events.len()
        ));

        if !report.scintillation_events.is_empty() {
            summary.push_str("\nTop 10 Events:\n");
            let mut events: Vec<&ScintillationEvent> = report.scintillation_events.iter().collect();
            events.sort_by(|a, b| b.s4.total_cmp(&a.s4));
            for (i, event) in events.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {} at {}: S4 = {:.3}\n",
                    i + 1,
                    event.satellite,
                    event.minute.format("%Y-%m-%d %H:%M"),
                    event.s4
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::decode;
    use crate::models::observation::gps_seconds_to_utc;

    fn record(svid: i64, minute: i64, s4: f64, sample_count: u64) -> S4Record {
        S4Record {
            satellite: decode(svid),
            minute: gps_seconds_to_utc(minute as f64 * 60.0).unwrap(),
            s4,
            sample_count,
            mean_snr_db: 40.0,
        }
    }

    #[test]
    fn test_report_counts() {
        let records = vec![
            record(1, 0, 0.1, 50),
            record(300, 0, 0.0, 1),
            record(1, 1, 0.45, 50),
            record(1, 4, f64::NAN, 3),
        ];
        let skipped = SkipCounts {
            invalid_snr: 4,
            filtered_satellite: 0,
        };

        let checker = IntegrityChecker::new();
        let report = checker.check_records(&records, 108, skipped);

        assert_eq!(report.samples_aggregated, 104);
        assert_eq!(report.rows_read, report.samples_aggregated + report.skipped.total());
        assert_eq!(report.total_windows, 4);
        assert_eq!(report.degenerate_windows, 1);
        assert_eq!(report.nan_windows, 1);
        assert_eq!(report.sentinel_samples, 1);
        assert_eq!(report.scintillation_events.len(), 1);

        let gps = &report.satellite_statistics[&decode(1)];
        assert_eq!(gps.windows, 3);
        assert_eq!(gps.tracking_gaps, 1);
        assert_eq!(gps.max_s4, Some(0.45));
        assert!((gps.mean_s4.unwrap() - 0.275).abs() < 1e-12);
    }

    #[test]
    fn test_summary_mentions_events() {
        let records = vec![record(5, 0, 0.8, 60)];
        let checker = IntegrityChecker::with_threshold(0.5);
        let report = checker.check_records(&records, 60, SkipCounts::default());

        let summary = checker.generate_summary(&report);
        assert!(summary.contains("Scintillation Events (S4 > 0.5): 1"));
        assert!(summary.contains("G05"));
    }
}
