//! Daily route computation: the single entry point used by handlers and the CLI

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RouteError;
use crate::services::assignment_filter::HolidayContextPolicy;
use crate::services::cache::TtlCache;
use crate::services::request_tracker::RequestTracker;
use crate::services::segment_estimator::SegmentEstimator;
use crate::services::sources::{AssignmentSource, HolidayCalendar};
use crate::services::stop_assembler::build_stops;
use crate::types::{DailyRoute, DailyRouteRequest, RouteStop, TravelMode};

/// Assembled stops for one worker and day, independent of travel mode
#[derive(Debug, Clone)]
struct DayPlan {
    holiday_context: bool,
    stops: Vec<RouteStop>,
}

pub struct RouteEngine {
    assignments: Arc<dyn AssignmentSource>,
    calendar: Arc<dyn HolidayCalendar>,
    estimator: SegmentEstimator,
    policy: HolidayContextPolicy,
    tracker: RequestTracker,
    day_plans: TtlCache<(Uuid, NaiveDate), DayPlan>,
}

pub fn parse_worker_id(raw: &str) -> Result<Uuid, RouteError> {
    Uuid::parse_str(raw.trim()).map_err(|_| RouteError::InvalidWorkerId(raw.to_string()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, RouteError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| RouteError::InvalidDate(raw.to_string()))
}

impl RouteEngine {
    pub fn new(
        assignments: Arc<dyn AssignmentSource>,
        calendar: Arc<dyn HolidayCalendar>,
        estimator: SegmentEstimator,
        policy: HolidayContextPolicy,
        plan_ttl: Duration,
    ) -> Self {
        Self {
            assignments,
            calendar,
            estimator,
            policy,
            tracker: RequestTracker::default(),
            day_plans: TtlCache::new(plan_ttl),
        }
    }

    /// Route for `worker_id` on `date` with default request options.
    pub async fn compute(&self, worker_id: &str, date: &str, mode: TravelMode) -> Result<DailyRoute, RouteError> {
        self.compute_daily_route(&DailyRouteRequest {
            worker_id: worker_id.to_string(),
            date: date.to_string(),
            mode,
            origin_address: None,
            session_key: None,
            refresh: false,
        })
        .await
    }

    /// Stops, segments and summary for one worker and day.
    ///
    /// Only requests carrying a session key are tracked. A newer request with
    /// the same key supersedes this one, which then fails with
    /// `RouteError::Cancelled` instead of returning stale data. Requests
    /// without a key never cancel each other.
    pub async fn compute_daily_route(&self, request: &DailyRouteRequest) -> Result<DailyRoute, RouteError> {
        let worker_id = parse_worker_id(&request.worker_id)?;
        let date = parse_date(&request.date)?;

        let session_key = request
            .session_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        let ticket = session_key.map(|key| self.tracker.begin(key));
        let untracked = CancellationToken::new();
        let token = ticket.as_ref().map_or(&untracked, |t| t.token());

        let plan = tokio::select! {
            _ = token.cancelled() => return Err(RouteError::Cancelled),
            plan = self.plan_day(worker_id, date, request.refresh) => plan?,
        };

        let report = self
            .estimator
            .build_segments(
                &plan.stops,
                request.origin_address.as_deref(),
                request.mode,
                token,
                request.refresh,
            )
            .await?;

        if let (Some(key), Some(ticket)) = (session_key, &ticket) {
            if !ticket.is_current() {
                debug!("Discarding stale route for {} (generation {})", key, ticket.generation());
                return Err(RouteError::Cancelled);
            }
        }

        info!(
            "Route for worker {} on {} ({}): {} stop(s), {} segment(s), {} min travel, confidence {:?}",
            worker_id,
            date,
            request.mode.as_str(),
            plan.stops.len(),
            report.segments.len(),
            report.summary.total_billable_minutes,
            report.summary.confidence
        );

        Ok(DailyRoute {
            worker_id,
            date,
            mode: request.mode,
            holiday_context: plan.holiday_context,
            stops: plan.stops,
            segments: report.segments,
            summary: report.summary,
            warnings: report.warnings,
        })
    }

    /// Cancel the in-flight request for `session_key`.
    pub fn cancel(&self, session_key: &str) -> bool {
        self.tracker.cancel(session_key)
    }

    pub fn travel_provider_name(&self) -> &str {
        self.estimator.provider_name()
    }

    /// Drop expired day plans and travel results (call periodically).
    pub fn cleanup_caches(&self) {
        self.day_plans.cleanup();
        self.estimator.cleanup_cache();
        debug!("Cache cleanup done, {} day plan(s) retained", self.day_plans.len());
    }

    async fn plan_day(&self, worker_id: Uuid, date: NaiveDate, refresh: bool) -> Result<DayPlan, RouteError> {
        let key = (worker_id, date);
        if !refresh {
            if let Some(plan) = self.day_plans.get(&key) {
                debug!("Using cached day plan for worker {} on {}", worker_id, date);
                return Ok(plan);
            }
        }

        let is_calendar_holiday = self
            .calendar
            .is_holiday(date.day(), date.month(), date.year())
            .await?;
        let holiday_context = self.policy.is_holiday_context(date, is_calendar_holiday);

        let assignments = self.assignments.active_assignments_for(worker_id, date).await?;
        debug!(
            "Worker {} has {} active assignment(s) on {} (holiday context: {})",
            worker_id,
            assignments.len(),
            date,
            holiday_context
        );

        let plan = DayPlan {
            holiday_context,
            stops: build_stops(&assignments, date, holiday_context),
        };
        self.day_plans.insert(key, plan.clone());
        Ok(plan)
    }
}
