//! Place search against a Nominatim-compatible endpoint

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::geo::GeoPoint;

/// Geocoding errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Search service returned {0}")]
    Status(u16),

    #[error("Search returned unusable coordinates: {0}")]
    InvalidCoordinates(String),
}

/// Nominatim sends coordinates as strings; accept numbers too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Text(String),
    Number(f64),
}

impl Coordinate {
    fn value(&self) -> Option<f64> {
        match self {
            Coordinate::Text(s) => s.trim().parse().ok(),
            Coordinate::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: Coordinate,
    lon: Coordinate,
    #[serde(default)]
    display_name: Option<String>,
}

/// Place search client
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GeocodeError> {
        Self::new(
            &config.geocoder_url,
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Look up a place name and return its first match
    ///
    /// A blank query returns `None` without a request.
    pub async fn search(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        debug!("Searching for {:?}", query);

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", query), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Search for {:?} returned {}", query, status);
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let places: Vec<Place> = response.json().await?;
        let Some(place) = places.into_iter().next() else {
            debug!("No match for {:?}", query);
            return Ok(None);
        };

        let (Some(lat), Some(lon)) = (place.lat.value(), place.lon.value()) else {
            return Err(GeocodeError::InvalidCoordinates(format!(
                "{:?}, {:?}",
                place.lat, place.lon
            )));
        };

        let point = GeoPoint::new(lat, lon)
            .map_err(|e| GeocodeError::InvalidCoordinates(e.to_string()))?;

        debug!(
            "Found {} at {:.5}, {:.5}",
            place.display_name.as_deref().unwrap_or(query),
            point.latitude,
            point.longitude
        );
        Ok(Some(point))
    }
}
