//! Travel-time providers for point-to-point legs
//!
//! Uses Valhalla for production, mock for tests and offline development.

mod valhalla;

pub use valhalla::{ValhallaConfig, ValhallaTravelProvider};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{Config, TravelBackend};
use crate::error::ProviderError;
use crate::services::geo;
use crate::services::geocoding::{MockGeocoder, RateLimitedNominatimGeocoder};
use crate::types::TravelMode;

/// Duration and distance of a single leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelEstimate {
    pub duration_seconds: u64,
    pub distance_meters: u64,
}

/// Travel-time provider trait (Valhalla, mock, etc.)
///
/// Implementations must be callable concurrently. Callers impose their own
/// timeout, so implementations need not.
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    async fn estimate(
        &self,
        from_address: &str,
        to_address: &str,
        mode: TravelMode,
    ) -> Result<TravelEstimate, ProviderError>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Mock provider: hash-geocoded coordinates, haversine × road coefficient
/// and a fixed average speed per mode
#[derive(Default)]
pub struct MockTravelProvider;

impl MockTravelProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TravelTimeProvider for MockTravelProvider {
    async fn estimate(
        &self,
        from_address: &str,
        to_address: &str,
        mode: TravelMode,
    ) -> Result<TravelEstimate, ProviderError> {
        if from_address.trim().is_empty() || to_address.trim().is_empty() {
            return Err(ProviderError::InvalidResponse("empty address".to_string()));
        }

        let from = MockGeocoder::hash_to_coordinates(from_address);
        let to = MockGeocoder::hash_to_coordinates(to_address);

        let distance_meters = (geo::road_distance(&from, &to) * 1000.0).round() as u64;
        let duration_seconds = geo::travel_time_seconds(&from, &to, mode).ceil().max(1.0) as u64;

        Ok(TravelEstimate {
            duration_seconds,
            distance_meters,
        })
    }

    fn name(&self) -> &str {
        "MockTravel"
    }
}

/// Provider used when no travel backend is reachable: every lookup fails,
/// so every leg falls back to its schedule-gap estimate
pub struct UnavailableTravelProvider {
    reason: String,
}

impl UnavailableTravelProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TravelTimeProvider for UnavailableTravelProvider {
    async fn estimate(
        &self,
        _from_address: &str,
        _to_address: &str,
        _mode: TravelMode,
    ) -> Result<TravelEstimate, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "Unavailable"
    }
}

/// Create travel provider based on configuration
///
/// `auto` tries Valhalla if a URL is configured and `/status` answers;
/// otherwise lookups are reported unavailable rather than faked.
pub async fn create_travel_provider(config: &Config) -> Result<Arc<dyn TravelTimeProvider>> {
    match config.travel_backend {
        TravelBackend::Mock => {
            info!("Using mock travel provider");
            Ok(Arc::new(MockTravelProvider::new()))
        }
        TravelBackend::None => {
            info!("Travel lookups disabled, all segments will use fallback estimates");
            Ok(Arc::new(UnavailableTravelProvider::new("travel lookups disabled")))
        }
        TravelBackend::Valhalla => {
            let url = config
                .valhalla_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("TRAVEL_BACKEND=valhalla requires VALHALLA_URL"))?;
            Ok(Arc::new(build_valhalla(config, &url)?))
        }
        TravelBackend::Auto => {
            if let Some(url) = &config.valhalla_url {
                match check_valhalla_health(url).await {
                    Ok(()) => {
                        info!("Valhalla routing service available at {}", url);
                        return Ok(Arc::new(build_valhalla(config, url)?));
                    }
                    Err(e) => {
                        warn!("Valhalla not available at {}: {}. Segments will use fallback estimates.", url, e);
                    }
                }
            }

            info!("No travel provider available (Valhalla not configured or unhealthy)");
            Ok(Arc::new(UnavailableTravelProvider::new("no travel provider configured")))
        }
    }
}

fn build_valhalla(config: &Config, url: &str) -> Result<ValhallaTravelProvider> {
    let geocoder = RateLimitedNominatimGeocoder::from_env(&config.nominatim_url)?;
    ValhallaTravelProvider::new(ValhallaConfig::new(url), Arc::new(geocoder), config.cache_ttl)
}

/// Check if Valhalla is healthy by making a simple status request
async fn check_valhalla_health(base_url: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()?;

    let url = format!("{}/status", base_url.trim_end_matches('/'));
    let response = client.get(&url).send().await?;

    if response.status().is_success() {
        Ok(())
    } else {
        anyhow::bail!("Valhalla returned status {}", response.status())
    }
}
