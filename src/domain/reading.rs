use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One raw, uncertain positioning sample as emitted by a positioning feed.
/// Readings are ephemeral: they only exist between the start of an
/// enhanced-GPS acquisition and the fusion that consumes them.
#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Reading {
    pub lat: f64,
    pub lng: f64,
    /// Estimated positional uncertainty radius in meters, smaller is better.
    pub accuracy: f64,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_a_feed_line() -> Result<(), serde_json::Error> {
        let line = r#"{ "lat": 51.86, "lng": 4.35, "accuracy": 7.5, "altitude": 2.0, "heading": null, "speed": 0.4, "timestamp": "2026-08-26T09:15:00Z" }"#;

        let reading: Reading = serde_json::from_str(line)?;

        assert_eq!(
            reading,
            Reading {
                lat: 51.86,
                lng: 4.35,
                accuracy: 7.5,
                altitude: Some(2.0),
                heading: None,
                speed: Some(0.4),
                timestamp: "2026-08-26T09:15:00Z".parse().unwrap(),
            }
        );
        Ok(())
    }

    #[test]
    fn deserializes_without_optional_fields() -> Result<(), serde_json::Error> {
        let line = r#"{ "lat": 51.86, "lng": 4.35, "accuracy": 12.0, "timestamp": "2026-08-26T09:15:01Z" }"#;

        let reading: Reading = serde_json::from_str(line)?;

        assert_eq!(reading.altitude, None);
        assert_eq!(reading.heading, None);
        assert_eq!(reading.speed, None);
        Ok(())
    }
}
