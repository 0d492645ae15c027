//! Route types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// How the worker travels between visits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Transit,
}

impl TravelMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            TravelMode::Driving => "DRIVING",
            TravelMode::Walking => "WALKING",
            TravelMode::Transit => "TRANSIT",
        }
    }
}

impl std::str::FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DRIVING" => Ok(TravelMode::Driving),
            "WALKING" => Ok(TravelMode::Walking),
            "TRANSIT" => Ok(TravelMode::Transit),
            other => Err(format!("unknown travel mode '{}'", other)),
        }
    }
}

/// A visit on the worker's day, derived from one resolved time slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStop {
    pub assignment_id: Uuid,
    pub label: String,
    pub start: String,
    pub end: String,
    pub start_minutes: u32,
    /// 1-based position in the day; 0 is reserved for the worker origin.
    pub order: u32,
    pub address: String,
    pub postal_code: String,
    pub city: String,
}

impl RouteStop {
    /// Address string handed to the travel provider.
    pub fn full_address(&self) -> String {
        let locality = [self.postal_code.trim(), self.city.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        if locality.is_empty() {
            self.address.trim().to_string()
        } else {
            format!("{}, {}", self.address.trim(), locality)
        }
    }
}

/// Which value a segment's travel time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentSource {
    Real,
    Estimate,
}

/// Travel between two consecutive stops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelSegment {
    pub from: RouteStop,
    pub to: RouteStop,
    pub travel_time_minutes: u32,
    pub is_zero_travel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<u64>,
    pub source: SegmentSource,
    /// Scheduled idle gap, kept even when a real value superseded it.
    pub fallback_minutes: u32,
}

/// Share of a day's legs backed by real provider data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Aggregate over a day's segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub total_billable_minutes: u32,
    pub total_distance_meters: u64,
    pub confidence: Confidence,
    pub real_segments: usize,
    pub estimated_segments: usize,
    pub zero_travel_segments: usize,
}

/// Non-fatal problem encountered while building the route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteWarning {
    pub segment_index: Option<usize>,
    pub warning_type: String,
    pub message: String,
}

/// Request to compute one worker's route for a day
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRouteRequest {
    pub worker_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub mode: TravelMode,
    #[serde(default)]
    pub origin_address: Option<String>,
    /// Requests sharing a key supersede each other; without one nothing is superseded.
    #[serde(default)]
    pub session_key: Option<String>,
    /// Bypass cached day plans and travel results.
    #[serde(default)]
    pub refresh: bool,
}

/// Computed route for one worker and day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRoute {
    pub worker_id: Uuid,
    pub date: NaiveDate,
    pub mode: TravelMode,
    pub holiday_context: bool,
    pub stops: Vec<RouteStop>,
    pub segments: Vec<TravelSegment>,
    pub summary: RouteSummary,
    pub warnings: Vec<RouteWarning>,
}

/// Cancel the in-flight route request for a session key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRouteRequest {
    pub session_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRouteResponse {
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stop(address: &str, postal_code: &str, city: &str) -> RouteStop {
        RouteStop {
            assignment_id: Uuid::nil(),
            label: "Servicio".into(),
            start: "09:00".into(),
            end: "10:00".into(),
            start_minutes: 540,
            order: 1,
            address: address.into(),
            postal_code: postal_code.into(),
            city: city.into(),
        }
    }

    #[test]
    fn full_address_joins_locality() {
        assert_eq!(stop("Calle A 1", "28001", "Madrid").full_address(), "Calle A 1, 28001 Madrid");
        assert_eq!(stop(" Calle A 1 ", "", "Madrid").full_address(), "Calle A 1, Madrid");
        assert_eq!(stop("Calle A 1", "", "").full_address(), "Calle A 1");
    }

    #[test]
    fn travel_mode_wire_format() {
        assert_eq!(serde_json::to_value(TravelMode::Transit).unwrap(), json!("TRANSIT"));
        assert_eq!("walking".parse::<TravelMode>(), Ok(TravelMode::Walking));
        assert!("BIKE".parse::<TravelMode>().is_err());
    }

    #[test]
    fn daily_route_request_defaults() {
        let req: DailyRouteRequest = serde_json::from_value(json!({
            "workerId": "0b8e3c9a-1111-4c2e-8f00-5d5b2b9d7a01",
            "date": "2024-03-04"
        }))
        .unwrap();
        assert_eq!(req.mode, TravelMode::Driving);
        assert!(req.origin_address.is_none());
        assert!(req.session_key.is_none());
        assert!(!req.refresh);
    }

    #[test]
    fn segment_source_and_confidence_are_lowercase() {
        assert_eq!(serde_json::to_value(SegmentSource::Estimate).unwrap(), json!("estimate"));
        assert_eq!(serde_json::to_value(Confidence::Medium).unwrap(), json!("medium"));
    }
}
