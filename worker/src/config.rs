//! Configuration management

use std::time::Duration;

use anyhow::{self, Result};

use crate::defaults::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_LOOKUP_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_LOOKUPS,
    MAX_CONCURRENT_LOOKUPS_CAP,
};

/// Which travel-time provider to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelBackend {
    /// Valhalla when configured and healthy, otherwise unavailable
    Auto,
    Valhalla,
    Mock,
    /// No provider: every leg uses the fallback estimate
    None,
}

impl TravelBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "valhalla" => TravelBackend::Valhalla,
            "mock" => TravelBackend::Mock,
            "none" => TravelBackend::None,
            "auto" | "" => TravelBackend::Auto,
            other => {
                tracing::warn!("Unknown TRAVEL_BACKEND '{}', using auto", other);
                TravelBackend::Auto
            }
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string (admin tool database)
    pub database_url: Option<String>,

    /// JSON fixture file used when no database is configured
    pub fixtures_path: Option<String>,

    /// Nominatim API URL (for geocoding)
    pub nominatim_url: String,

    /// Valhalla routing engine URL
    pub valhalla_url: Option<String>,

    pub travel_backend: TravelBackend,

    /// Upper bound on in-flight provider lookups per request
    pub max_concurrent_lookups: usize,

    pub lookup_timeout: Duration,

    /// TTL of travel results and assembled day plans
    pub cache_ttl: Duration,

    /// Treat Saturdays as holiday context (Sundays always are)
    pub saturday_is_holiday: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = non_empty_var("DATABASE_URL");
        let fixtures_path = non_empty_var("FIXTURES_PATH");

        if database_url.is_none() && fixtures_path.is_none() {
            anyhow::bail!("Either DATABASE_URL or FIXTURES_PATH must be set");
        }

        let nominatim_url = std::env::var("NOMINATIM_URL")
            .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string());

        let valhalla_url = non_empty_var("VALHALLA_URL");

        let travel_backend = TravelBackend::parse(
            &std::env::var("TRAVEL_BACKEND").unwrap_or_default(),
        );

        let max_concurrent_lookups = parsed_var("TRAVEL_MAX_CONCURRENCY")
            .unwrap_or(DEFAULT_MAX_CONCURRENT_LOOKUPS)
            .clamp(1, MAX_CONCURRENT_LOOKUPS_CAP);

        let lookup_timeout = Duration::from_secs(
            parsed_var("TRAVEL_LOOKUP_TIMEOUT_SECS").unwrap_or(DEFAULT_LOOKUP_TIMEOUT_SECS),
        );

        let cache_ttl = Duration::from_secs(
            parsed_var("TRAVEL_CACHE_TTL_SECS").unwrap_or(DEFAULT_CACHE_TTL_SECS),
        );

        let saturday_is_holiday = std::env::var("SATURDAY_IS_HOLIDAY")
            .map(|v| parse_flag("SATURDAY_IS_HOLIDAY", &v))
            .unwrap_or(false);

        Ok(Self {
            nats_url,
            database_url,
            fixtures_path,
            nominatim_url,
            valhalla_url,
            travel_backend,
            max_concurrent_lookups,
            lookup_timeout,
            cache_ttl,
            saturday_is_holiday,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Boolean env flag; unrecognised values are logged and read as `false`.
fn parse_flag(name: &str, value: &str) -> bool {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" | "" => false,
        other => {
            tracing::warn!("Unrecognised {} value '{}', using false", name, other);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_backend_parse() {
        assert_eq!(TravelBackend::parse("valhalla"), TravelBackend::Valhalla);
        assert_eq!(TravelBackend::parse("MOCK"), TravelBackend::Mock);
        assert_eq!(TravelBackend::parse("none"), TravelBackend::None);
        assert_eq!(TravelBackend::parse(""), TravelBackend::Auto);
        assert_eq!(TravelBackend::parse("osrm"), TravelBackend::Auto);
    }

    #[test]
    fn test_parse_flag_accepts_common_spellings() {
        for value in ["true", "TRUE", "1", "yes", " on "] {
            assert!(parse_flag("SATURDAY_IS_HOLIDAY", value), "{value}");
        }
        for value in ["false", "0", "no", "off", "", "sometimes"] {
            assert!(!parse_flag("SATURDAY_IS_HOLIDAY", value), "{value}");
        }
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_requires_a_data_source() {
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("FIXTURES_PATH");

        assert!(Config::from_env().is_err());
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_defaults() {
        std::env::remove_var("DATABASE_URL");
        std::env::set_var("FIXTURES_PATH", "fixtures.json");
        std::env::remove_var("TRAVEL_MAX_CONCURRENCY");
        std::env::remove_var("SATURDAY_IS_HOLIDAY");

        let config = Config::from_env().unwrap();
        assert_eq!(config.max_concurrent_lookups, DEFAULT_MAX_CONCURRENT_LOOKUPS);
        assert_eq!(config.lookup_timeout, Duration::from_secs(10));
        assert!(!config.saturday_is_holiday);

        std::env::remove_var("FIXTURES_PATH");
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_concurrency_is_clamped() {
        std::env::set_var("FIXTURES_PATH", "fixtures.json");
        std::env::set_var("TRAVEL_MAX_CONCURRENCY", "500");

        let config = Config::from_env().unwrap();
        assert_eq!(config.max_concurrent_lookups, MAX_CONCURRENT_LOOKUPS_CAP);

        std::env::remove_var("TRAVEL_MAX_CONCURRENCY");
        std::env::remove_var("FIXTURES_PATH");
    }
}
