//! Assembly of a worker's day into chronologically ordered visit stops.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::defaults::FALLBACK_STOP_LABEL;
use crate::services::assignment_filter::applies_today;
use crate::services::schedule_resolver::{parse_schedule, resolve_slots};
use crate::types::{Assignment, ClientProfile, RouteStop};

/// `"{first} {last}"`, or the generic label when both are blank.
pub fn stop_label(client: &ClientProfile) -> String {
    let label = format!("{} {}", client.first_name.trim(), client.last_name.trim());
    let label = label.trim();
    if label.is_empty() {
        FALLBACK_STOP_LABEL.to_string()
    } else {
        label.to_string()
    }
}

/// Build the day's stops: one per resolved slot of every applicable
/// assignment, sorted by start time.
///
/// Sorting is stable, so stops starting at the same minute keep the order
/// of `assignments` (and of slots within an assignment). Stops are never
/// merged, even when two visits share an address and time.
pub fn build_stops(
    assignments: &[Assignment],
    date: NaiveDate,
    use_holiday_context: bool,
) -> Vec<RouteStop> {
    let mut stops = Vec::new();

    for assignment in assignments {
        if !assignment.is_active_on(date) {
            debug!("Assignment {} not active on {}, skipping", assignment.id, date);
            continue;
        }

        let parsed = match parse_schedule(&assignment.schedule) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Assignment {} has an unusable schedule: {}", assignment.id, e);
                continue;
            }
        };

        if parsed.dropped_slots > 0 || parsed.dropped_buckets > 0 {
            warn!(
                "Assignment {}: dropped {} malformed slot(s) and {} malformed day bucket(s)",
                assignment.id, parsed.dropped_slots, parsed.dropped_buckets
            );
        }

        let slots = resolve_slots(&parsed.schedule, date, use_holiday_context);
        if !applies_today(assignment.assignment_type, &slots, use_holiday_context) {
            debug!(
                "Assignment {} ({}) does not apply on {}: {} slot(s), holiday context {}",
                assignment.id,
                assignment.assignment_type.as_str(),
                date,
                slots.len(),
                use_holiday_context
            );
            continue;
        }

        let label = stop_label(&assignment.client);
        for slot in slots {
            stops.push(RouteStop {
                assignment_id: assignment.id,
                label: label.clone(),
                start_minutes: slot.start_minutes(),
                start: slot.start,
                end: slot.end,
                order: 0,
                address: assignment.client.address.clone(),
                postal_code: assignment.client.postal_code.clone(),
                city: assignment.client.city.clone(),
            });
        }
    }

    stops.sort_by_key(|stop| stop.start_minutes);
    for (idx, stop) in stops.iter_mut().enumerate() {
        stop.order = idx as u32 + 1;
    }

    stops
}
