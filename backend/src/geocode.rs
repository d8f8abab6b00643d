use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, RewardsError};

const MIN_QUERY_CHARS: usize = 3;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Place {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
}

#[derive(Clone)]
pub struct NominatimClient {
    http: Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(config: &Config) -> Result<Self> {
        // Nominatim's usage policy rejects requests without an identifying agent
        let http = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .user_agent(config.nominatim_user_agent.clone())
            .build()
            .map_err(|e| RewardsError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.nominatim_url.trim_end_matches('/').to_string(),
        })
    }

    /// Candidates in the provider's ranking order. Short queries return nothing
    /// without a round trip.
    pub async fn search(&self, query: &str) -> Result<Vec<Place>> {
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", query)])
            .send()
            .await
            .map_err(|e| RewardsError::Geocoding(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RewardsError::Geocoding(format!(
                "search returned {}",
                response.status()
            )));
        }

        let raw: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| RewardsError::Geocoding(format!("invalid response body: {e}")))?;

        let places = raw
            .into_iter()
            .filter_map(|place| {
                let lat = place.lat.parse().ok()?;
                let lon = place.lon.parse().ok()?;
                Some(Place {
                    address: place.display_name,
                    lat,
                    lon,
                })
            })
            .collect();

        Ok(places)
    }
}
