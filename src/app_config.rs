use crate::fusion::FusionSettings;
use config::Config;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    fusion: FusionSettings,
    positioning: Positioning,
    ip_lookup: IpLookup,
    geocoder: GeocoderConfig,
}

impl AppConfig {
    pub fn load() -> Self {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::default())
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    pub fn fusion(&self) -> &FusionSettings {
        &self.fusion
    }

    pub fn positioning(&self) -> &Positioning {
        &self.positioning
    }

    pub fn ip_lookup(&self) -> &IpLookup {
        &self.ip_lookup
    }

    pub fn geocoder(&self) -> &GeocoderConfig {
        &self.geocoder
    }
}

#[derive(Debug, Deserialize)]
pub struct Positioning {
    feed_path: String,
    #[serde(with = "humantime_serde")]
    fix_timeout: Duration,
}

impl Positioning {
    pub fn feed_path(&self) -> &str {
        &self.feed_path
    }

    pub fn fix_timeout(&self) -> Duration {
        self.fix_timeout
    }
}

#[derive(Debug, Deserialize)]
pub struct IpLookup {
    url: String,
}

impl IpLookup {
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Deserialize)]
pub struct GeocoderConfig {
    url: String,
}

impl GeocoderConfig {
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                fusion: FusionSettings::default(),
                positioning: Positioning {
                    feed_path: "/run/positioning/feed.ndjson".to_string(),
                    fix_timeout: Duration::from_secs(45),
                },
                ip_lookup: IpLookup {
                    url: "https://ip.lookup/json/".to_string(),
                },
                geocoder: GeocoderConfig {
                    url: "https://geocoder.url".to_string(),
                },
            },
        }
    }

    pub fn ip_lookup_url(mut self, url: String) -> Self {
        self.config.ip_lookup.url = url;
        self
    }

    pub fn geocoder_url(mut self, url: String) -> Self {
        self.config.geocoder.url = url;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
