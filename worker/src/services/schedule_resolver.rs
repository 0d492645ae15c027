//! Schedule resolution: which time slots of an assignment apply on a date.
//!
//! The admin tool stores schedules as free-form JSON:
//!
//! ```json
//! {
//!   "monday":  { "enabled": true, "timeSlots": [{ "start": "8:00", "end": "10:00" }] },
//!   "sunday":  { "enabled": false, "timeSlots": [] },
//!   "holiday": { "enabled": true, "timeSlots": [{ "start": "09:00", "end": "10:00" }] }
//! }
//! ```
//!
//! Parsing is lenient. A slot whose `start` or `end` is not `H:MM`/`HH:MM`
//! is dropped, a bucket that is not an object is treated as missing, and a
//! schedule that is not a JSON object resolves to no slots at all. Nothing
//! here returns an error to the route builder.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::defaults::UNSPECIFIED_DAY_ENABLED;
use crate::types::{weekday_from_key, DayConfig, HolidayConfig, TimeSlot, WeeklySchedule};

/// Keys under which the holiday bucket may be stored.
const HOLIDAY_KEYS: [&str; 3] = ["holiday", "holidays", "festivos"];

/// Schedule-level parse failure. Always recovered by the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("schedule is not a JSON object")]
    NotAnObject,
}

/// Result of parsing a raw schedule, with counters for discarded entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSchedule {
    pub schedule: WeeklySchedule,
    pub dropped_slots: usize,
    pub dropped_buckets: usize,
}

/// Validate and zero-pad one clock value. `"8:05"` → `"08:05"`.
///
/// Accepts `H:MM` or `HH:MM` after trimming surrounding whitespace. Values
/// outside a real clock (`"25:00"`, `"10:75"`) are rejected too, so every
/// returned time has minutes since midnight below 1440.
pub fn normalize_time(raw: &str) -> Option<String> {
    let (h, m) = raw.trim().split_once(':')?;
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !(1..=2).contains(&h.len()) || m.len() != 2 || !digits(h) || !digits(m) {
        return None;
    }

    let time = NaiveTime::from_hms_opt(h.parse().ok()?, m.parse().ok()?, 0)?;
    Some(time.format("%H:%M").to_string())
}

/// Normalize a raw `{start, end}` object; `None` if either side is invalid.
pub fn normalize_slot(raw: &Value) -> Option<TimeSlot> {
    let start = normalize_time(raw.get("start")?.as_str()?)?;
    let end = normalize_time(raw.get("end")?.as_str()?)?;
    Some(TimeSlot { start, end })
}

/// Parse a raw schedule value. Accepts an object or a JSON-encoded string.
pub fn parse_schedule(raw: &Value) -> Result<ParsedSchedule, ScheduleError> {
    let decoded;
    let value = match raw {
        Value::String(text) => {
            decoded = serde_json::from_str::<Value>(text)
                .map_err(|e| ScheduleError::InvalidJson(e.to_string()))?;
            &decoded
        }
        other => other,
    };

    let object = value.as_object().ok_or(ScheduleError::NotAnObject)?;
    let mut parsed = ParsedSchedule::default();

    for (key, bucket_value) in object {
        let is_holiday_key = HOLIDAY_KEYS.contains(&key.trim().to_lowercase().as_str());
        let weekday = weekday_from_key(key);
        if weekday.is_none() && !is_holiday_key {
            continue;
        }

        let Some(bucket) = parse_bucket(bucket_value) else {
            parsed.dropped_buckets += 1;
            continue;
        };
        parsed.dropped_slots += bucket.dropped;

        match weekday {
            Some(day) => {
                parsed.schedule.days.insert(
                    day,
                    DayConfig { enabled: bucket.enabled, time_slots: bucket.slots },
                );
            }
            None => {
                parsed.schedule.holiday = Some(HolidayConfig {
                    enabled: bucket.enabled,
                    time_slots: bucket.slots,
                });
            }
        }
    }

    Ok(parsed)
}

/// Slots of `schedule` that apply on `date`.
///
/// Holiday context reads only the holiday bucket; otherwise the weekday
/// bucket is used, with an explicitly disabled day yielding nothing.
pub fn resolve_slots(
    schedule: &WeeklySchedule,
    date: NaiveDate,
    use_holiday_context: bool,
) -> Vec<TimeSlot> {
    if use_holiday_context {
        return match &schedule.holiday {
            Some(holiday) if holiday.enabled => holiday.time_slots.clone(),
            _ => Vec::new(),
        };
    }

    match schedule.day(date.weekday()) {
        Some(day) if !day.enabled => Vec::new(),
        Some(day) => day.time_slots.clone(),
        // Missing bucket: enabled per UNSPECIFIED_DAY_ENABLED, but has no slots.
        None => Vec::new(),
    }
}

struct ParsedBucket {
    enabled: bool,
    slots: Vec<TimeSlot>,
    dropped: usize,
}

fn parse_bucket(value: &Value) -> Option<ParsedBucket> {
    let object = value.as_object()?;

    let enabled = parse_enabled(object);
    let raw_slots = object
        .get("timeSlots")
        .or_else(|| object.get("time_slots"))
        .and_then(Value::as_array);

    let mut slots = Vec::new();
    let mut dropped = 0;
    for raw in raw_slots.into_iter().flatten() {
        match normalize_slot(raw) {
            Some(slot) => slots.push(slot),
            None => dropped += 1,
        }
    }

    Some(ParsedBucket { enabled, slots, dropped })
}

fn parse_enabled(object: &Map<String, Value>) -> bool {
    match object.get("enabled") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        _ => UNSPECIFIED_DAY_ENABLED,
    }
}
