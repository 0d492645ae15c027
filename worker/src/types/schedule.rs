//! Recurring service schedule types
//!
//! These are the *normalized* forms produced by the schedule resolver.
//! The raw schedule stored with an assignment is free-form JSON and is
//! parsed leniently (see `services::schedule_resolver`).

use std::collections::HashMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Weekday for a schedule key (`"monday"` … `"sunday"`), case-insensitive.
pub fn weekday_from_key(key: &str) -> Option<Weekday> {
    match key.trim().to_lowercase().as_str() {
        "sunday" => Some(Weekday::Sun),
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        _ => None,
    }
}

/// A validated, zero-padded `HH:MM` interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

impl TimeSlot {
    /// Minutes since midnight of `start`.
    pub fn start_minutes(&self) -> u32 {
        clock_minutes(&self.start).unwrap_or(0)
    }

    /// Minutes since midnight of `end`.
    pub fn end_minutes(&self) -> u32 {
        clock_minutes(&self.end).unwrap_or(0)
    }
}

/// Parse `H:MM` / `HH:MM` into minutes since midnight.
pub fn clock_minutes(value: &str) -> Option<u32> {
    let (h, m) = value.trim().split_once(':')?;
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    Some(hours * 60 + minutes)
}

/// Configuration of one weekday bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayConfig {
    pub enabled: bool,
    pub time_slots: Vec<TimeSlot>,
}

/// Holiday bucket, used instead of the weekday bucket in holiday context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayConfig {
    pub enabled: bool,
    pub time_slots: Vec<TimeSlot>,
}

/// Weekly schedule with its embedded holiday bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub days: HashMap<Weekday, DayConfig>,
    pub holiday: Option<HolidayConfig>,
}

impl WeeklySchedule {
    pub fn day(&self, weekday: Weekday) -> Option<&DayConfig> {
        self.days.get(&weekday)
    }
}
