use crate::acquisition::geocoder::{GeocodeError, Geocoder};
use crate::acquisition::ip_lookup::IpEstimate;
use crate::acquisition::operator::OperatorInput;
use crate::acquisition::positioning::{PositioningError, PositioningSource};
use crate::domain::{AcquisitionMethod, Coordinate, Location, LocationMetadata};
use crate::fusion::{self, FusionError, FusionSettings};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument};

/// Assumed accuracy of operator-entered coordinates, e.g. from an RTK rover
/// or a total station.
const MANUAL_ACCURACY_M: f64 = 0.1;
/// Assumed accuracy of a city-level IP estimate.
const IP_LOCATION_ACCURACY_M: f64 = 5000.0;
/// Typical accuracy of a geocoded street address.
const GEOCODING_ACCURACY_M: f64 = 10.0;

/// Uniform contract over the four acquisition strategies. Whatever the
/// method, `acquire` produces the same `Location` shape, so callers never
/// branch on the method beyond selecting it.
#[derive(Debug)]
pub struct LocationService {
    positioning: Box<dyn PositioningSource>,
    operator: Box<dyn OperatorInput>,
    geocoder: Geocoder,
    ip_estimate: Option<IpEstimate>,
    fusion_settings: FusionSettings,
    accuracy_tx: watch::Sender<f64>,
}

impl LocationService {
    pub fn new(
        positioning: Box<dyn PositioningSource>,
        operator: Box<dyn OperatorInput>,
        geocoder: Geocoder,
        ip_estimate: Option<IpEstimate>,
        fusion_settings: FusionSettings,
    ) -> Self {
        let (accuracy_tx, _) = watch::channel(0.0);
        LocationService {
            positioning,
            operator,
            geocoder,
            ip_estimate,
            fusion_settings,
            accuracy_tx,
        }
    }

    /// Live accuracy of incoming readings during an enhanced-GPS acquisition.
    pub fn accuracy_updates(&self) -> watch::Receiver<f64> {
        self.accuracy_tx.subscribe()
    }

    #[instrument(skip(self))]
    pub async fn acquire(&self, method: AcquisitionMethod) -> Result<Location, AcquisitionError> {
        info!("📍 Acquiring location via {}...", method);
        let location = match method {
            AcquisitionMethod::EnhancedGps => self.enhanced_gps().await?,
            AcquisitionMethod::Manual => self.manual().await?,
            AcquisitionMethod::IpLocation => self.ip_location().await?,
            AcquisitionMethod::Geocoding => self.geocoding().await?,
        };

        info!("📍 Acquiring location via {}... OK, ±{}m", method, location.accuracy_m);
        Ok(location)
    }

    async fn enhanced_gps(&self) -> Result<Location, AcquisitionError> {
        let stream = self.positioning.watch().await?;
        let location = fusion::fuse(stream, &self.fusion_settings, &self.accuracy_tx).await?;
        Ok(location)
    }

    async fn manual(&self) -> Result<Location, AcquisitionError> {
        let lat = self.prompt_coordinate_part("Latitude (e.g. -12.123456)").await?;
        let lng = self.prompt_coordinate_part("Longitude (e.g. -77.123456)").await?;
        let coordinate = Coordinate::new(lat, lng).map_err(|e| AcquisitionError::InvalidCoordinates(e.to_string()))?;

        Ok(Location {
            coordinate,
            accuracy_m: MANUAL_ACCURACY_M,
            method: AcquisitionMethod::Manual,
            metadata: LocationMetadata::None,
        })
    }

    async fn prompt_coordinate_part(&self, label: &str) -> Result<f64, AcquisitionError> {
        let Some(text) = self.operator.prompt_text(label).await else {
            return Err(AcquisitionError::InvalidCoordinates("no coordinates provided".to_string()));
        };

        text.trim().parse::<f64>().map_err(|_| AcquisitionError::InvalidCoordinates(format!("'{}' is not a number", text)))
    }

    async fn ip_location(&self) -> Result<Location, AcquisitionError> {
        let Some(estimate) = &self.ip_estimate else {
            return Err(AcquisitionError::Unavailable);
        };

        let message = format!(
            "Use approximate IP location? {}, {} at {}, {}, accuracy ~{}km",
            estimate.city,
            estimate.country,
            estimate.coordinate.lat,
            estimate.coordinate.lng,
            IP_LOCATION_ACCURACY_M / 1000.0
        );
        if !self.operator.prompt_confirm(&message).await {
            return Err(AcquisitionError::Rejected);
        }

        Ok(Location {
            coordinate: estimate.coordinate,
            accuracy_m: IP_LOCATION_ACCURACY_M,
            method: AcquisitionMethod::IpLocation,
            metadata: LocationMetadata::Place {
                city: estimate.city.clone(),
                country: estimate.country.clone(),
            },
        })
    }

    async fn geocoding(&self) -> Result<Location, AcquisitionError> {
        let Some(address) = self.operator.prompt_text("Address").await else {
            return Err(AcquisitionError::LookupError("no address provided".to_string()));
        };

        let geocoded = self.geocoder.geocode(&address).await?;

        Ok(Location {
            coordinate: geocoded.coordinate,
            accuracy_m: GEOCODING_ACCURACY_M,
            method: AcquisitionMethod::Geocoding,
            metadata: LocationMetadata::Address {
                display_name: geocoded.display_name,
            },
        })
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum AcquisitionError {
    #[error("no positioning readings received")]
    NoSignal,
    #[error("positioning timed out")]
    Timeout,
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("coarse IP estimate rejected by the operator")]
    Rejected,
    #[error("no coarse IP estimate available")]
    Unavailable,
    #[error("address not found")]
    NotFound,
    #[error("address lookup failed: {0}")]
    LookupError(String),
}

impl From<PositioningError> for AcquisitionError {
    fn from(e: PositioningError) -> Self {
        match e {
            PositioningError::Timeout => AcquisitionError::Timeout,
            PositioningError::Feed(_) => AcquisitionError::NoSignal,
        }
    }
}

impl From<FusionError> for AcquisitionError {
    fn from(e: FusionError) -> Self {
        match e {
            FusionError::NoSignal => AcquisitionError::NoSignal,
            FusionError::Source(e) => e.into(),
        }
    }
}

impl From<GeocodeError> for AcquisitionError {
    fn from(e: GeocodeError) -> Self {
        match e {
            GeocodeError::NotFound => AcquisitionError::NotFound,
            e => AcquisitionError::LookupError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::operator::ScriptedInput;
    use crate::acquisition::positioning::ScriptedPositioningSource;
    use crate::domain::Reading;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use reqwest::Client;
    use test_log::test;

    fn dummy_geocoder() -> Geocoder {
        Geocoder::new(Client::new(), "http://127.0.0.1:1")
    }

    fn rotterdam_estimate() -> IpEstimate {
        IpEstimate {
            coordinate: Coordinate { lat: 51.8615899, lng: 4.3580323 },
            city: "Rotterdam".to_string(),
            country: "Netherlands".to_string(),
        }
    }

    fn reading(lat: f64, lng: f64, accuracy: f64) -> Reading {
        Reading {
            lat,
            lng,
            accuracy,
            altitude: None,
            heading: None,
            speed: None,
            timestamp: Utc::now(),
        }
    }

    #[test(tokio::test)]
    async fn acquires_a_manual_location_from_operator_input() -> Result<(), AcquisitionError> {
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::with_texts(vec![Some("-12.123456"), Some("-77.123456")])),
            dummy_geocoder(),
            None,
            FusionSettings::default(),
        );

        let location = service.acquire(AcquisitionMethod::Manual).await?;

        assert_eq!(
            location,
            Location {
                coordinate: Coordinate {
                    lat: -12.123456,
                    lng: -77.123456,
                },
                accuracy_m: 0.1,
                method: AcquisitionMethod::Manual,
                metadata: LocationMetadata::None,
            }
        );
        Ok(())
    }

    #[test(tokio::test)]
    async fn rejects_manual_coordinates_out_of_bounds() {
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::with_texts(vec![Some("91.0"), Some("0.0")])),
            dummy_geocoder(),
            None,
            FusionSettings::default(),
        );

        let result = service.acquire(AcquisitionMethod::Manual).await;

        assert!(matches!(result, Err(AcquisitionError::InvalidCoordinates(_))));
    }

    #[test(tokio::test)]
    async fn rejects_manual_coordinates_that_are_not_numbers() {
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::with_texts(vec![Some("twelve"), Some("0.0")])),
            dummy_geocoder(),
            None,
            FusionSettings::default(),
        );

        let result = service.acquire(AcquisitionMethod::Manual).await;

        assert!(matches!(result, Err(AcquisitionError::InvalidCoordinates(_))));
    }

    #[test(tokio::test)]
    async fn rejects_a_cancelled_manual_prompt() {
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::with_texts(vec![None])),
            dummy_geocoder(),
            None,
            FusionSettings::default(),
        );

        let result = service.acquire(AcquisitionMethod::Manual).await;

        assert_eq!(result, Err(AcquisitionError::InvalidCoordinates("no coordinates provided".to_string())));
    }

    #[test(tokio::test)]
    async fn ip_location_fails_without_a_cached_estimate() {
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::confirming(true)),
            dummy_geocoder(),
            None,
            FusionSettings::default(),
        );

        let result = service.acquire(AcquisitionMethod::IpLocation).await;

        assert_eq!(result, Err(AcquisitionError::Unavailable));
    }

    #[test(tokio::test)]
    async fn ip_location_fails_when_the_operator_declines() {
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::confirming(false)),
            dummy_geocoder(),
            Some(rotterdam_estimate()),
            FusionSettings::default(),
        );

        let result = service.acquire(AcquisitionMethod::IpLocation).await;

        assert_eq!(result, Err(AcquisitionError::Rejected));
    }

    #[test(tokio::test)]
    async fn ip_location_uses_the_confirmed_estimate() -> Result<(), AcquisitionError> {
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::confirming(true)),
            dummy_geocoder(),
            Some(rotterdam_estimate()),
            FusionSettings::default(),
        );

        let location = service.acquire(AcquisitionMethod::IpLocation).await?;

        assert_eq!(location.coordinate, Coordinate { lat: 51.8615899, lng: 4.3580323 });
        assert_eq!(location.accuracy_m, 5000.0);
        assert_eq!(location.method, AcquisitionMethod::IpLocation);
        assert_eq!(
            location.metadata,
            LocationMetadata::Place {
                city: "Rotterdam".to_string(),
                country: "Netherlands".to_string(),
            }
        );
        Ok(())
    }

    #[test(tokio::test)]
    async fn geocoding_resolves_the_prompted_address() -> Result<(), AcquisitionError> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "Coolsingel 40, Rotterdam".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(include_str!("../../tests/resources/geocode_response.json"))
            .create_async()
            .await;

        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::with_texts(vec![Some("Coolsingel 40, Rotterdam")])),
            Geocoder::new(Client::new(), server.url()),
            None,
            FusionSettings::default(),
        );

        let location = service.acquire(AcquisitionMethod::Geocoding).await?;

        assert_eq!(location.coordinate, Coordinate { lat: 51.9228958, lng: 4.4792387 });
        assert_eq!(location.accuracy_m, 10.0);
        assert_eq!(location.method, AcquisitionMethod::Geocoding);
        assert_eq!(
            location.metadata,
            LocationMetadata::Address {
                display_name: "Stadhuis, Coolsingel 40, Rotterdam, Netherlands".to_string(),
            }
        );
        Ok(())
    }

    #[test(tokio::test)]
    async fn geocoding_maps_an_empty_result_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::with_texts(vec![Some("gibberish")])),
            Geocoder::new(Client::new(), server.url()),
            None,
            FusionSettings::default(),
        );

        let result = service.acquire(AcquisitionMethod::Geocoding).await;

        assert_eq!(result, Err(AcquisitionError::NotFound));
    }

    #[test(tokio::test)]
    async fn geocoding_maps_a_service_error_to_lookup_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/search").match_query(mockito::Matcher::Any).with_status(503).create_async().await;

        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::unavailable()),
            Box::new(ScriptedInput::with_texts(vec![Some("Coolsingel 40")])),
            Geocoder::new(Client::new(), server.url()),
            None,
            FusionSettings::default(),
        );

        let result = service.acquire(AcquisitionMethod::Geocoding).await;

        assert!(matches!(result, Err(AcquisitionError::LookupError(_))));
    }

    #[test(tokio::test)]
    async fn enhanced_gps_fuses_readings_from_the_positioning_source() -> Result<(), AcquisitionError> {
        let items = vec![Ok(reading(1.0, 1.0, 8.0)), Ok(reading(1.0, 1.0, 4.0)), Ok(reading(1.0, 1.0, 6.0))];
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::new(items)),
            Box::new(ScriptedInput::confirming(false)),
            dummy_geocoder(),
            None,
            FusionSettings::default(),
        );
        let accuracy_rx = service.accuracy_updates();

        let location = service.acquire(AcquisitionMethod::EnhancedGps).await?;

        assert_eq!(location.coordinate, Coordinate { lat: 1.0, lng: 1.0 });
        assert_eq!(location.accuracy_m, 4.0);
        assert_eq!(
            location.metadata,
            LocationMetadata::Fusion {
                readings_used: 3,
                total_readings: 3,
            }
        );
        assert_eq!(*accuracy_rx.borrow(), 6.0);
        Ok(())
    }

    #[test(tokio::test)]
    async fn enhanced_gps_fails_with_no_signal_without_readings() {
        let service = LocationService::new(
            Box::new(ScriptedPositioningSource::new(vec![])),
            Box::new(ScriptedInput::confirming(false)),
            dummy_geocoder(),
            None,
            FusionSettings::default(),
        );

        let result = service.acquire(AcquisitionMethod::EnhancedGps).await;

        assert_eq!(result, Err(AcquisitionError::NoSignal));
    }
}
