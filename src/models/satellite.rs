use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ProcessingError;
use crate::utils::constants::{SVID_NOT_AVAILABLE, SVID_UNKNOWN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Constellation {
    Gps,
    Glonass,
    Galileo,
    Sbas,
    BeiDou,
    Qzss,
    NavIc,
}

impl Constellation {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'G' => Some(Constellation::Gps),
            'R' => Some(Constellation::Glonass),
            'E' => Some(Constellation::Galileo),
            'S' => Some(Constellation::Sbas),
            'C' => Some(Constellation::BeiDou),
            'J' => Some(Constellation::Qzss),
            'I' => Some(Constellation::NavIc),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Constellation::Gps => 'G',
            Constellation::Glonass => 'R',
            Constellation::Galileo => 'E',
            Constellation::Sbas => 'S',
            Constellation::BeiDou => 'C',
            Constellation::Qzss => 'J',
            Constellation::NavIc => 'I',
        }
    }
}

/// Canonical satellite code derived from a receiver SVID.
///
/// `NotAvailable` covers SVID categories that exist in the receiver numbering
/// but carry no satellite slot (GLONASS unknown slot, L-band beams).
/// `Unknown` is returned for anything outside the numbering plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SatelliteCode {
    Slot { constellation: Constellation, prn: u8 },
    NotAvailable,
    Unknown,
}

impl SatelliteCode {
    pub fn constellation(&self) -> Option<Constellation> {
        match self {
            SatelliteCode::Slot { constellation, .. } => Some(*constellation),
            _ => None,
        }
    }

    pub fn is_slot(&self) -> bool {
        matches!(self, SatelliteCode::Slot { .. })
    }
}

impl fmt::Display for SatelliteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SatelliteCode::Slot { constellation, prn } => {
                write!(f, "{}{:02}", constellation.letter(), prn)
            }
            SatelliteCode::NotAvailable => f.write_str(SVID_NOT_AVAILABLE),
            SatelliteCode::Unknown => f.write_str(SVID_UNKNOWN),
        }
    }
}

impl FromStr for SatelliteCode {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == SVID_NOT_AVAILABLE {
            return Ok(SatelliteCode::NotAvailable);
        }
        if s == SVID_UNKNOWN {
            return Ok(SatelliteCode::Unknown);
        }

        let mut chars = s.chars();
        let constellation = chars
            .next()
            .and_then(Constellation::from_letter)
            .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid satellite code: '{}'", s)))?;
        let prn = chars
            .as_str()
            .parse::<u8>()
            .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid satellite code: '{}'", s)))?;

        Ok(SatelliteCode::Slot { constellation, prn })
    }
}

impl Serialize for SatelliteCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SatelliteCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy)]
enum SvidMapping {
    Slot(Constellation, i64),
    NotAvailable,
}

#[derive(Debug, Clone, Copy)]
struct SvidRange {
    first: i64,
    last: i64,
    mapping: SvidMapping,
}

const fn slot(first: i64, last: i64, constellation: Constellation, offset: i64) -> SvidRange {
    SvidRange {
        first,
        last,
        mapping: SvidMapping::Slot(constellation, offset),
    }
}

const fn not_available(first: i64, last: i64) -> SvidRange {
    SvidRange {
        first,
        last,
        mapping: SvidMapping::NotAvailable,
    }
}

/// Receiver SVID numbering plan. Ranges are disjoint; gaps decode to `Unknown`.
const SVID_TABLE: [SvidRange; 13] = [
    slot(1, 37, Constellation::Gps, 0),
    slot(38, 61, Constellation::Glonass, 37),
    not_available(62, 62),
    slot(63, 68, Constellation::Glonass, 38),
    slot(71, 106, Constellation::Galileo, 70),
    not_available(107, 119),
    slot(120, 140, Constellation::Sbas, 100),
    slot(141, 180, Constellation::BeiDou, 140),
    slot(181, 187, Constellation::Qzss, 180),
    slot(191, 197, Constellation::NavIc, 190),
    slot(198, 215, Constellation::Sbas, 157),
    slot(216, 222, Constellation::NavIc, 208),
    slot(223, 245, Constellation::BeiDou, 182),
];

/// Decode a raw receiver SVID into its canonical satellite code.
///
/// Total over all integers: values outside the numbering plan yield
/// [`SatelliteCode::Unknown`] instead of an error.
pub fn decode(svid: i64) -> SatelliteCode {
    SVID_TABLE
        .iter()
        .find(|range| (range.first..=range.last).contains(&svid))
        .map(|range| match range.mapping {
            SvidMapping::Slot(constellation, offset) => SatelliteCode::Slot {
                constellation,
                // every slot range ends at most 63 above its offset
                prn: (svid - offset) as u8,
            },
            SvidMapping::NotAvailable => SatelliteCode::NotAvailable,
        })
        .unwrap_or(SatelliteCode::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_table() {
        assert_eq!(decode(1).to_string(), "G01");
        assert_eq!(decode(37).to_string(), "G37");
        assert_eq!(decode(38).to_string(), "R01");
        assert_eq!(decode(61).to_string(), "R24");
        assert_eq!(decode(62).to_string(), "NA");
        assert_eq!(decode(63).to_string(), "R25");
        assert_eq!(decode(68).to_string(), "R30");
        assert_eq!(decode(71).to_string(), "E01");
        assert_eq!(decode(106).to_string(), "E36");
        assert_eq!(decode(110).to_string(), "NA");
        assert_eq!(decode(120).to_string(), "S20");
        assert_eq!(decode(141).to_string(), "C01");
        assert_eq!(decode(181).to_string(), "J01");
        assert_eq!(decode(191).to_string(), "I01");
        assert_eq!(decode(198).to_string(), "S41");
        assert_eq!(decode(216).to_string(), "I08");
        assert_eq!(decode(223).to_string(), "C41");
        assert_eq!(decode(245).to_string(), "C63");
    }

    #[test]
    fn test_decode_out_of_table() {
        for svid in [-5, 0, 69, 70, 188, 189, 190, 246, 300, i64::MAX] {
            assert_eq!(decode(svid), SatelliteCode::Unknown, "svid {}", svid);
        }
        assert_eq!(decode(300).to_string(), "Unknown SVID");
    }

    #[test]
    fn test_decode_is_deterministic() {
        for svid in 0..=260 {
            assert_eq!(decode(svid), decode(svid));
        }
    }

    #[test]
    fn test_satellite_code_parse() {
        let code: SatelliteCode = "G01".parse().unwrap();
        assert_eq!(code, decode(1));
        assert_eq!("NA".parse::<SatelliteCode>().unwrap(), SatelliteCode::NotAvailable);
        assert_eq!(
            "Unknown SVID".parse::<SatelliteCode>().unwrap(),
            SatelliteCode::Unknown
        );
        assert!("X12".parse::<SatelliteCode>().is_err());
        assert!("G".parse::<SatelliteCode>().is_err());
    }

    #[test]
    fn test_constellation_of_code() {
        assert_eq!(decode(150).constellation(), Some(Constellation::BeiDou));
        assert_eq!(decode(62).constellation(), None);
        assert!(!decode(500).is_slot());
    }
}
