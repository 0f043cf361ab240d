use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::models::observation::linear_to_db;
use crate::models::s4::S4Record;
use crate::models::satellite::SatelliteCode;

/// Aggregation bucket: one satellite over one UTC minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowKey {
    pub satellite: SatelliteCode,
    pub minute: DateTime<Utc>,
}

impl WindowKey {
    pub fn new(satellite: SatelliteCode, minute: DateTime<Utc>) -> Self {
        Self { satellite, minute }
    }
}

/// Truncate seconds and sub-second components.
pub fn minute_floor(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(timestamp)
}

/// Running sums for one window.
///
/// Merging is associative and commutative, so partial sums built from
/// different chunks can be combined in any order before finalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowAccumulator {
    pub count: u64,
    pub sum_linear_snr: f64,
    pub sum_sq_linear_snr: f64,
}

impl WindowAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, linear_snr: f64) {
        self.count += 1;
        self.sum_linear_snr += linear_snr;
        self.sum_sq_linear_snr += linear_snr * linear_snr;
    }

    pub fn merge(&mut self, other: &WindowAccumulator) {
        self.count += other.count;
        self.sum_linear_snr += other.sum_linear_snr;
        self.sum_sq_linear_snr += other.sum_sq_linear_snr;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.sum_linear_snr / self.count as f64
    }

    /// Population variance, clamped at zero against cancellation error.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        let mean = self.mean();
        (self.sum_sq_linear_snr / self.count as f64 - mean * mean).max(0.0)
    }

    /// Standard deviation over mean. A single sample yields 0; NaN inputs yield NaN.
    pub fn s4(&self) -> f64 {
        let mean = self.mean();
        if !mean.is_finite() || mean == 0.0 {
            return f64::NAN;
        }
        if self.count < 2 {
            return 0.0;
        }
        self.variance().sqrt() / mean
    }

    pub fn finalize(&self, key: WindowKey) -> S4Record {
        S4Record {
            satellite: key.satellite,
            minute: key.minute,
            s4: self.s4(),
            sample_count: self.count,
            mean_snr_db: linear_to_db(self.mean()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::observation::{db_to_linear, gps_seconds_to_utc};

    fn accumulate(values: &[f64]) -> WindowAccumulator {
        let mut acc = WindowAccumulator::new();
        for v in values {
            acc.push(*v);
        }
        acc
    }

    #[test]
    fn test_minute_floor() {
        let ts = gps_seconds_to_utc(125.75).unwrap();
        assert_eq!(minute_floor(ts), gps_seconds_to_utc(120.0).unwrap());
        let exact = gps_seconds_to_utc(60.0).unwrap();
        assert_eq!(minute_floor(exact), exact);
    }

    #[test]
    fn test_single_sample_is_degenerate() {
        let acc = accumulate(&[db_to_linear(42.0)]);
        assert_eq!(acc.s4(), 0.0);
    }

    #[test]
    fn test_s4_two_samples() {
        let acc = accumulate(&[db_to_linear(40.0), db_to_linear(43.0)]);
        let a = 10_000.0;
        let b = db_to_linear(43.0);
        let mean = (a + b) / 2.0;
        let expected = ((b - a) / 2.0) / mean;
        assert!((acc.s4() - expected).abs() < 1e-12);
        assert!((acc.s4() - 0.332_27).abs() < 1e-4);
    }

    #[test]
    fn test_constant_signal_has_zero_s4() {
        let acc = accumulate(&[5_000.0; 50]);
        assert!(acc.s4().abs() < 1e-9);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let values: Vec<f64> = (0..20).map(|i| db_to_linear(35.0 + i as f64 * 0.3)).collect();
        let whole = accumulate(&values);

        let mut left = accumulate(&values[..7]);
        let right = accumulate(&values[7..]);
        left.merge(&right);

        assert_eq!(left.count, whole.count);
        assert!((left.s4() - whole.s4()).abs() < 1e-12);
    }

    #[test]
    fn test_nan_propagates() {
        let acc = accumulate(&[f64::NAN, 10.0]);
        assert!(acc.s4().is_nan());
        assert!(accumulate(&[f64::NAN]).s4().is_nan());
    }
}
