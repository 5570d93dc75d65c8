use crate::domain::{Coordinate, CoordinateError};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument};

/// Resolves a free-text address to a coordinate via an external geocoding
/// service (geocode.maps.co search API shape).
#[derive(Clone, Debug)]
pub struct Geocoder {
    client: Client,
    base_url: String,
}

/// A successfully geocoded address.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodedAddress {
    pub coordinate: Coordinate,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    // The service returns coordinates as strings
    lat: String,
    lon: String,
    display_name: String,
}

impl Geocoder {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Geocoder {
            client,
            base_url: base_url.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        info!("🏠 Geocoding address...");

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", address), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?;

        let mut results = response.json::<Vec<SearchResult>>().await?;
        let Some(result) = results.drain(..).next() else {
            info!("🏠 Geocoding address... no match");
            return Err(GeocodeError::NotFound);
        };

        let lat = result.lat.parse::<f64>().map_err(|_| GeocodeError::MalformedCoordinate(result.lat.clone()))?;
        let lon = result.lon.parse::<f64>().map_err(|_| GeocodeError::MalformedCoordinate(result.lon.clone()))?;
        let coordinate = Coordinate::new(lat, lon)?;

        info!("🏠 Geocoding address... OK, '{}'", result.display_name);
        Ok(GeocodedAddress {
            coordinate,
            display_name: result.display_name,
        })
    }
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("address not found")]
    NotFound,
    #[error("geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder returned a malformed coordinate: '{0}'")]
    MalformedCoordinate(String),
    #[error("geocoder returned an out-of-bounds coordinate: {0}")]
    OutOfBounds(#[from] CoordinateError),
}
