//! Valhalla routing engine provider
//!
//! Valhalla API documentation:
//! https://valhalla.github.io/valhalla/api/turn-by-turn/api-reference/

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TravelEstimate, TravelTimeProvider};
use crate::error::ProviderError;
use crate::services::cache::TtlCache;
use crate::services::geocoding::Geocoder;
use crate::types::{Coordinates, TravelMode};

/// Valhalla client configuration
#[derive(Debug, Clone)]
pub struct ValhallaConfig {
    /// Base URL of Valhalla server (e.g., "http://localhost:8002")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ValhallaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ValhallaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }
}

/// Valhalla costing model for a travel mode
fn costing(mode: TravelMode) -> &'static str {
    match mode {
        TravelMode::Driving => "auto",
        TravelMode::Walking => "pedestrian",
        TravelMode::Transit => "multimodal",
    }
}

/// Travel-time provider backed by Valhalla `/route`
///
/// Addresses are geocoded first; coordinates are cached per address so a
/// day with repeated clients geocodes each household once.
pub struct ValhallaTravelProvider {
    client: Client,
    config: ValhallaConfig,
    geocoder: Arc<dyn Geocoder>,
    coordinates: TtlCache<String, Coordinates>,
}

impl ValhallaTravelProvider {
    pub fn new(
        config: ValhallaConfig,
        geocoder: Arc<dyn Geocoder>,
        coordinate_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            geocoder,
            coordinates: TtlCache::new(coordinate_ttl),
        })
    }

    async fn locate(&self, address: &str) -> Result<Coordinates, ProviderError> {
        let key = address.trim().to_lowercase();
        if let Some(coords) = self.coordinates.get(&key) {
            return Ok(coords);
        }

        let result = self
            .geocoder
            .geocode(address)
            .await?
            .ok_or_else(|| ProviderError::InvalidResponse(format!("address not found: {}", address)))?;

        debug!("Geocoded '{}' via {} to {:?}", address, self.geocoder.name(), result.coordinates);
        self.coordinates.insert(key, result.coordinates);
        Ok(result.coordinates)
    }

    /// Build the route request for a single leg
    fn build_route_request(&self, from: Coordinates, to: Coordinates, mode: TravelMode) -> RouteRequest {
        let locations = [from, to]
            .iter()
            .map(|c| ValhallaLocation {
                lat: c.lat,
                lon: c.lng,
                // 500m radius – sufficient for Nominatim-geocoded coordinates
                // that may be slightly off-road (building centroid vs road edge)
                radius: Some(500),
            })
            .collect();

        RouteRequest {
            locations,
            costing: costing(mode).to_string(),
            units: "kilometers".to_string(),
            directions_type: "none".to_string(), // Only the summary is needed
        }
    }
}

#[async_trait]
impl TravelTimeProvider for ValhallaTravelProvider {
    async fn estimate(
        &self,
        from_address: &str,
        to_address: &str,
        mode: TravelMode,
    ) -> Result<TravelEstimate, ProviderError> {
        let from = self.locate(from_address).await?;
        let to = self.locate(to_address).await?;

        let request = self.build_route_request(from, to, mode);
        let url = format!("{}/route", self.config.base_url);

        debug!("Requesting {} route from Valhalla", request.costing);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Failed to send route request to Valhalla: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "Valhalla route returned error {}: {}",
                status, body
            )));
        }

        let route_response: RouteResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse Valhalla route response: {}", e)))?;

        summary_to_estimate(&route_response.trip.summary)
    }

    fn name(&self) -> &str {
        "Valhalla"
    }
}

/// Convert a route summary (seconds, kilometers) into an estimate
fn summary_to_estimate(summary: &Summary) -> Result<TravelEstimate, ProviderError> {
    if !summary.time.is_finite() || summary.time < 0.0 {
        return Err(ProviderError::InvalidResponse(format!("invalid route time {}", summary.time)));
    }

    let distance_meters = if summary.length.is_finite() && summary.length > 0.0 {
        (summary.length * 1000.0).round() as u64
    } else {
        0
    };

    Ok(TravelEstimate {
        duration_seconds: summary.time.round() as u64,
        distance_meters,
    })
}

// Valhalla API types

#[derive(Debug, Serialize, Clone)]
struct ValhallaLocation {
    lat: f64,
    lon: f64,
    /// Radius in meters for snapping to roads
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RouteRequest {
    locations: Vec<ValhallaLocation>,
    costing: String,
    units: String,
    directions_type: String,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    trip: Trip,
}

#[derive(Debug, Deserialize)]
struct Trip {
    summary: Summary,
}

#[derive(Debug, Deserialize)]
struct Summary {
    /// Time in seconds
    time: f64,
    /// Length in kilometers (when units="kilometers")
    length: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocoding::MockGeocoder;

    fn provider(base_url: &str) -> ValhallaTravelProvider {
        ValhallaTravelProvider::new(
            ValhallaConfig::new(base_url),
            Arc::new(MockGeocoder::new()),
            Duration::from_secs(60),
        )
        .unwrap()
    }

    #[test]
    fn test_valhalla_config_default() {
        let config = ValhallaConfig::default();
        assert_eq!(config.base_url, "http://localhost:8002");
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_valhalla_config_strips_trailing_slash() {
        let config = ValhallaConfig::new("http://valhalla:8002/");
        assert_eq!(config.base_url, "http://valhalla:8002");
    }

    #[test]
    fn test_costing_per_mode() {
        assert_eq!(costing(TravelMode::Driving), "auto");
        assert_eq!(costing(TravelMode::Walking), "pedestrian");
        assert_eq!(costing(TravelMode::Transit), "multimodal");
    }

    #[test]
    fn test_build_route_request() {
        let client = provider("http://localhost:8002");

        let sol = Coordinates { lat: 40.4169, lng: -3.7035 };
        let atocha = Coordinates { lat: 40.4066, lng: -3.6892 };

        let request = client.build_route_request(sol, atocha, TravelMode::Walking);

        assert_eq!(request.locations.len(), 2);
        assert_eq!(request.costing, "pedestrian");
        assert_eq!(request.units, "kilometers");
        assert_eq!(request.directions_type, "none");
        assert!((request.locations[0].lat - 40.4169).abs() < 0.0001);
        assert!((request.locations[1].lon + 3.6892).abs() < 0.0001);
    }

    #[test]
    fn test_parse_route_summary() {
        let body = r#"{"trip":{"summary":{"time":754.2,"length":5.318},"legs":[]}}"#;
        let response: RouteResponse = serde_json::from_str(body).unwrap();
        let estimate = summary_to_estimate(&response.trip.summary).unwrap();

        assert_eq!(estimate.duration_seconds, 754);
        assert_eq!(estimate.distance_meters, 5318);
    }

    #[test]
    fn test_negative_time_is_invalid() {
        let err = summary_to_estimate(&Summary { time: -1.0, length: 1.0 }).unwrap_err();
        assert_eq!(err.warning_type(), "PROVIDER_INVALID");
    }

    #[tokio::test]
    async fn test_coordinates_are_cached_per_address() {
        let client = provider("http://localhost:8002");

        let first = client.locate("Calle Mayor 1").await.unwrap();
        let second = client.locate(" calle mayor 1 ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.coordinates.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let client = provider("http://localhost:1");
        let err = client
            .estimate("Calle A 1", "Calle B 2", TravelMode::Driving)
            .await
            .unwrap_err();
        assert_eq!(err.warning_type(), "PROVIDER_ERROR");
    }

    #[test]
    fn test_valhalla_provider_name() {
        assert_eq!(provider("http://localhost:8002").name(), "Valhalla");
    }

    #[tokio::test]
    #[ignore = "Requires running Valhalla server"]
    async fn test_valhalla_integration_madrid_leg() {
        let client = provider("http://localhost:8002");

        let estimate = client
            .estimate("Puerta del Sol, Madrid", "Atocha, Madrid", TravelMode::Driving)
            .await
            .unwrap();

        assert!(estimate.duration_seconds > 0);
        assert!(estimate.distance_meters > 0);
    }
}
