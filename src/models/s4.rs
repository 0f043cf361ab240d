use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::satellite::SatelliteCode;

/// Finalized S4 value for one satellite-minute. Never mutated once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S4Record {
    pub satellite: SatelliteCode,
    pub minute: DateTime<Utc>,
    pub s4: f64,
    pub sample_count: u64,
    pub mean_snr_db: f64,
}

impl S4Record {
    pub fn is_degenerate(&self) -> bool {
        self.sample_count < 2
    }

    pub fn is_scintillating(&self, threshold: f64) -> bool {
        self.s4 > threshold
    }
}

/// Output order: by minute, then satellite.
pub fn chronological(a: &S4Record, b: &S4Record) -> Ordering {
    a.minute
        .cmp(&b.minute)
        .then_with(|| a.satellite.cmp(&b.satellite))
}
