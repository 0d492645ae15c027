//! Which assignments apply on a given day.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::types::{AssignmentType, TimeSlot};

/// How a calendar date maps to holiday context.
///
/// Sundays and calendar holidays always use the holiday bucket. Saturdays
/// only do when `saturday_is_holiday` is set; the default keeps them as
/// regular working days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HolidayContextPolicy {
    pub saturday_is_holiday: bool,
}

impl HolidayContextPolicy {
    pub fn is_holiday_context(&self, date: NaiveDate, is_calendar_holiday: bool) -> bool {
        is_calendar_holiday
            || match date.weekday() {
                Weekday::Sun => true,
                Weekday::Sat => self.saturday_is_holiday,
                _ => false,
            }
    }
}

/// Type-level inclusion: `festivos` on holidays, `laborables` on working
/// days, `flexible` always.
pub fn include_assignment(assignment_type: AssignmentType, use_holiday_context: bool) -> bool {
    match assignment_type {
        AssignmentType::Flexible => true,
        AssignmentType::Festivos => use_holiday_context,
        AssignmentType::Laborables => !use_holiday_context,
    }
}

/// Wrong type and "no slots today" both mean the assignment does not apply.
///
/// `todays_slots` are the slots resolved for the same date and context.
pub fn applies_today(
    assignment_type: AssignmentType,
    todays_slots: &[TimeSlot],
    use_holiday_context: bool,
) -> bool {
    include_assignment(assignment_type, use_holiday_context) && !todays_slots.is_empty()
}
