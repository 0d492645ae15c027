//! Assignment types (read-only snapshot of the scheduling subsystem)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which calendar context an assignment covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentType {
    /// Working days only
    Laborables,
    /// Holidays and Sundays only
    Festivos,
    /// Any day
    Flexible,
}

impl AssignmentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssignmentType::Laborables => "laborables",
            AssignmentType::Festivos => "festivos",
            AssignmentType::Flexible => "flexible",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "laborables" => Some(AssignmentType::Laborables),
            "festivos" => Some(AssignmentType::Festivos),
            "flexible" => Some(AssignmentType::Flexible),
            _ => None,
        }
    }
}

/// Assignment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
    #[serde(other)]
    Inactive,
}

impl AssignmentStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "active" => AssignmentStatus::Active,
            "paused" => AssignmentStatus::Paused,
            "completed" => AssignmentStatus::Completed,
            "cancelled" => AssignmentStatus::Cancelled,
            _ => AssignmentStatus::Inactive,
        }
    }
}

/// Client (service user) data needed to label and locate a visit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientProfile {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
}

/// A worker ↔ client service assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub worker_id: Uuid,
    /// Client id
    pub user_id: Uuid,
    pub assignment_type: AssignmentType,
    /// Raw schedule as stored by the admin tool; may be malformed.
    #[serde(default)]
    pub schedule: serde_json::Value,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub client: ClientProfile,
}

impl Assignment {
    /// `start_date <= date`, open or later end date, and status active.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.status == AssignmentStatus::Active
            && self.start_date <= date
            && self.end_date.map_or(true, |end| end >= date)
    }
}
