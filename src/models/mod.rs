pub mod observation;
pub mod s4;
pub mod satellite;
pub mod window;

pub use observation::{RawObservation, Sample};
pub use s4::{chronological, S4Record};
pub use satellite::{decode, Constellation, SatelliteCode};
pub use window::{WindowAccumulator, WindowKey};
