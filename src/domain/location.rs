use crate::domain::Coordinate;
use std::fmt::{Display, Formatter};

/// A resolved coordinate with an accuracy radius and the method that produced
/// it. Immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub coordinate: Coordinate,
    /// Uncertainty radius in meters, smaller is better.
    pub accuracy_m: f64,
    pub method: AcquisitionMethod,
    pub metadata: LocationMetadata,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquisitionMethod {
    EnhancedGps,
    Manual,
    IpLocation,
    Geocoding,
}

impl Display for AcquisitionMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionMethod::EnhancedGps => write!(f, "enhanced-gps"),
            AcquisitionMethod::Manual => write!(f, "manual"),
            AcquisitionMethod::IpLocation => write!(f, "ip-location"),
            AcquisitionMethod::Geocoding => write!(f, "geocoding"),
        }
    }
}

/// Method-specific detail carried along with a resolved location.
#[derive(Clone, Debug, PartialEq)]
pub enum LocationMetadata {
    None,
    Fusion { readings_used: usize, total_readings: usize },
    Place { city: String, country: String },
    Address { display_name: String },
}
