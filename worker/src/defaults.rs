//! Named defaults and policies shared across the engine

/// A weekday bucket that is missing, or has no `enabled` field, counts as
/// enabled. Kept as a single switch so the policy can change in one place.
pub const UNSPECIFIED_DAY_ENABLED: bool = true;

/// Label used when a client has neither first nor last name.
pub const FALLBACK_STOP_LABEL: &str = "Servicio";

/// Label of the synthetic stop representing the worker's starting point.
pub const ORIGIN_STOP_LABEL: &str = "Inicio";

pub const DEFAULT_MAX_CONCURRENT_LOOKUPS: usize = 6;
pub const MAX_CONCURRENT_LOOKUPS_CAP: usize = 16;

pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 900;

/// A single leg longer than this is a bad provider answer, not a trip.
pub const MAX_TRAVEL_SECONDS: u64 = 24 * 60 * 60;
