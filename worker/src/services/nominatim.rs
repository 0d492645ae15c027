//! Nominatim geocoding client

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Coordinates;

/// Countries searched by default (ISO 3166-1alpha2, comma separated)
const DEFAULT_COUNTRY_CODES: &str = "es";

/// Nominatim API response
#[derive(Debug, Deserialize)]
pub struct NominatimResult {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

/// Nominatim geocoding client
pub struct NominatimClient {
    base_url: String,
    country_codes: String,
    client: reqwest::Client,
}

impl NominatimClient {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("homecare-route-worker/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            country_codes: DEFAULT_COUNTRY_CODES.to_string(),
            client,
        })
    }

    fn search_url(&self, address: &str) -> String {
        format!(
            "{}/search?q={}&format=json&countrycodes={}&limit=1",
            self.base_url,
            urlencoding::encode(address),
            self.country_codes
        )
    }

    /// Geocode a free-form address to coordinates
    pub async fn geocode(&self, address: &str) -> Result<Option<(Coordinates, String)>> {
        let response = self.client
            .get(self.search_url(address))
            .send()
            .await
            .context("Failed to send geocoding request")?;

        if !response.status().is_success() {
            anyhow::bail!("Nominatim returned status {}", response.status());
        }

        let results: Vec<NominatimResult> = response
            .json()
            .await
            .context("Failed to parse geocoding response")?;

        match results.first() {
            Some(result) => {
                let lat: f64 = result.lat.parse().context("Invalid latitude")?;
                let lng: f64 = result.lon.parse().context("Invalid longitude")?;
                Ok(Some((Coordinates { lat, lng }, result.display_name.clone())))
            }
            None => Ok(None),
        }
    }
}
