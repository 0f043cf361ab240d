use crate::error::Result;
use crate::models::{RawObservation, Sample, SatelliteCode};
use crate::settings::{InvalidSnrPolicy, PipelineSettings};
use crate::utils::constants::{NOT_VALID_THRESHOLD, SECONDS_PER_GPS_WEEK};
use serde::Serialize;
use std::collections::BTreeSet;

/// Rows dropped before aggregation, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub invalid_snr: u64,
    pub filtered_satellite: u64,
}

impl SkipCounts {
    pub fn total(&self) -> u64 {
        self.invalid_snr + self.filtered_satellite
    }
}

/// Stateless row → sample conversion, applied a whole chunk at a time.
pub struct EpochTransform {
    week_offset_seconds: f64,
    invalid_snr: InvalidSnrPolicy,
    satellites: Option<BTreeSet<SatelliteCode>>,
}

impl EpochTransform {
    pub fn new() -> Self {
        Self {
            week_offset_seconds: 0.0,
            invalid_snr: InvalidSnrPolicy::Skip,
            satellites: None,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Result<Self> {
        Ok(Self {
            week_offset_seconds: settings
                .gps_week
                .map_or(0.0, |week| week as f64 * SECONDS_PER_GPS_WEEK),
            invalid_snr: settings.invalid_snr,
            satellites: settings.satellite_filter()?,
        })
    }

    pub fn with_invalid_snr(mut self, policy: InvalidSnrPolicy) -> Self {
        self.invalid_snr = policy;
        self
    }

    /// Convert one row; `Ok(None)` when the row is dropped.
    pub fn apply(
        &self,
        observation: &RawObservation,
        skipped: &mut SkipCounts,
    ) -> Result<Option<Sample>> {
        let mut observation = *observation;
        observation.time_of_week += self.week_offset_seconds;

        let unavailable = !observation.snr_db.is_finite() || observation.snr_db <= NOT_VALID_THRESHOLD;
        if unavailable || observation.snr_db <= 0.0 {
            match self.invalid_snr {
                InvalidSnrPolicy::Skip => {
                    skipped.invalid_snr += 1;
                    return Ok(None);
                }
                InvalidSnrPolicy::Propagate if unavailable => {
                    observation.snr_db = f64::NAN;
                }
                InvalidSnrPolicy::Propagate => {}
            }
        }

        let sample = Sample::from_observation(&observation)?;

        if let Some(allowed) = &self.satellites {
            if !allowed.contains(&sample.satellite) {
                skipped.filtered_satellite += 1;
                return Ok(None);
            }
        }

        Ok(Some(sample))
    }

    pub fn apply_chunk(
        &self,
        rows: &[RawObservation],
        skipped: &mut SkipCounts,
    ) -> Result<Vec<Sample>> {
        let mut samples = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(sample) = self.apply(row, skipped)? {
                samples.push(sample);
            }
        }
        Ok(samples)
    }
}

impl Default for EpochTransform {
    fn default() -> Self {
        Self::new()
    }
}
