//! Read-only collaborators the engine pulls its inputs from
//!
//! Assignments and holidays are owned by the admin tool. Production reads
//! them from its Postgres database (`db::queries`); development and tests
//! use a JSON fixture file.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::types::Assignment;

/// Snapshot of a worker's assignments
#[async_trait]
pub trait AssignmentSource: Send + Sync {
    /// Assignments of `worker_id` active on `date`, in a stable order.
    async fn active_assignments_for(&self, worker_id: Uuid, date: NaiveDate) -> Result<Vec<Assignment>>;
}

/// Calendar of public holidays
#[async_trait]
pub trait HolidayCalendar: Send + Sync {
    async fn is_holiday(&self, day: u32, month: u32, year: i32) -> Result<bool>;
}

/// Contents of a fixture file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureData {
    pub assignments: Vec<Assignment>,
    pub holidays: Vec<NaiveDate>,
}

impl FixtureData {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid fixture file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// In-memory assignment source
pub struct StaticAssignmentSource {
    assignments: Vec<Assignment>,
}

impl StaticAssignmentSource {
    pub fn new(mut assignments: Vec<Assignment>) -> Self {
        assignments.sort_by_key(|a| (a.start_date, a.id));
        Self { assignments }
    }
}

#[async_trait]
impl AssignmentSource for StaticAssignmentSource {
    async fn active_assignments_for(&self, worker_id: Uuid, date: NaiveDate) -> Result<Vec<Assignment>> {
        Ok(self
            .assignments
            .iter()
            .filter(|a| a.worker_id == worker_id && a.is_active_on(date))
            .cloned()
            .collect())
    }
}

/// In-memory holiday calendar
#[derive(Default)]
pub struct StaticHolidayCalendar {
    holidays: HashSet<NaiveDate>,
}

impl StaticHolidayCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }
}

#[async_trait]
impl HolidayCalendar for StaticHolidayCalendar {
    async fn is_holiday(&self, day: u32, month: u32, year: i32) -> Result<bool> {
        Ok(NaiveDate::from_ymd_opt(year, month, day).is_some_and(|d| self.holidays.contains(&d)))
    }
}
