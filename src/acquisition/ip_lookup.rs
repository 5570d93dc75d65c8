use crate::domain::Coordinate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// A coarse, city-level position estimate derived from the caller's IP
/// address. Advisory only, never used for precise measurements.
#[derive(Clone, Debug, PartialEq)]
pub struct IpEstimate {
    pub coordinate: Coordinate,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: f64,
    lon: f64,
    city: String,
    country: String,
}

/// Best-effort lookup of a coarse IP-based estimate. Every failure mode is
/// downgraded to `None`: this path is advisory and must never destabilize a
/// survey session.
#[instrument(skip_all)]
pub async fn lookup(client: &Client, url: &str) -> Option<IpEstimate> {
    info!("🌐 Looking up coarse IP estimate...");

    let response = match client.get(url).send().await.and_then(|r| r.error_for_status()) {
        Ok(response) => response,
        Err(e) => {
            warn!("🌐 Looking up coarse IP estimate... failed: {}", e);
            return None;
        }
    };

    let body = match response.json::<IpApiResponse>().await {
        Ok(body) => body,
        Err(e) => {
            warn!("🌐 Looking up coarse IP estimate... failed to parse: {}", e);
            return None;
        }
    };

    if body.status != "success" {
        warn!("🌐 Looking up coarse IP estimate... provider returned status '{}'", body.status);
        return None;
    }

    let coordinate = match Coordinate::new(body.lat, body.lon) {
        Ok(coordinate) => coordinate,
        Err(e) => {
            warn!("🌐 Looking up coarse IP estimate... provider returned {}", e);
            return None;
        }
    };

    info!("🌐 Looking up coarse IP estimate... OK, {} ({})", body.city, body.country);
    Some(IpEstimate {
        coordinate,
        city: body.city,
        country: body.country,
    })
}
