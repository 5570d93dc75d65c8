pub mod geocoder;
pub mod ip_lookup;
pub mod operator;
pub mod positioning;
mod service;

pub use service::{AcquisitionError, LocationService};
