use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::satellite::{decode, SatelliteCode};
use crate::models::window::{minute_floor, WindowKey};
use crate::utils::constants::GPS_EPOCH_UNIX_MILLIS;

/// One measurement row as read from the converted receiver output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub svid: i64,
    /// Seconds since the GPS epoch (or time-of-week when a week offset is applied).
    pub time_of_week: f64,
    pub snr_db: f64,
}

impl RawObservation {
    pub fn new(svid: i64, time_of_week: f64, snr_db: f64) -> Self {
        Self {
            svid,
            time_of_week,
            snr_db,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub satellite: SatelliteCode,
    pub timestamp: DateTime<Utc>,
    pub linear_snr: f64,
}

impl Sample {
    /// Convert a raw observation: timestamp = GPS epoch + seconds, linear SNR = 10^(dB/10).
    pub fn from_observation(observation: &RawObservation) -> Result<Self> {
        Ok(Self {
            satellite: decode(observation.svid),
            timestamp: gps_seconds_to_utc(observation.time_of_week)?,
            linear_snr: db_to_linear(observation.snr_db),
        })
    }

    pub fn window_key(&self) -> WindowKey {
        WindowKey::new(self.satellite, minute_floor(self.timestamp))
    }
}

pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

pub fn linear_to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// Absolute instant of `seconds` after 1980-01-06T00:00:00 UTC, at millisecond resolution.
pub fn gps_seconds_to_utc(seconds: f64) -> Result<DateTime<Utc>> {
    if !seconds.is_finite() {
        return Err(ProcessingError::InvalidFormat(format!(
            "Non-finite GPS time: {}",
            seconds
        )));
    }

    let millis = (seconds * 1000.0).round() as i64;
    GPS_EPOCH_UNIX_MILLIS
        .checked_add(millis)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            ProcessingError::InvalidFormat(format!("GPS time out of range: {}", seconds))
        })
}
