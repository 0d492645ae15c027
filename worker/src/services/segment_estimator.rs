//! Travel segments between consecutive stops
//!
//! Each adjacent pair of stops becomes one segment. Same-household pairs are
//! zero-travel and never reach the provider. Every other pair gets a
//! schedule-gap fallback up front and a provider lookup in a bounded pool;
//! a positive provider duration replaces the fallback. A failed, slow or
//! nonsensical lookup only downgrades its own segment.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::defaults::{MAX_TRAVEL_SECONDS, ORIGIN_STOP_LABEL};
use crate::error::{ProviderError, RouteError};
use crate::services::cache::TtlCache;
use crate::services::travel::{TravelEstimate, TravelTimeProvider};
use crate::types::{
    clock_minutes, Confidence, RouteStop, RouteSummary, RouteWarning, SegmentSource,
    TravelMode, TravelSegment,
};

type LookupKey = (String, String, TravelMode);

/// Segments of one day with their aggregate and the non-fatal problems hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReport {
    pub segments: Vec<TravelSegment>,
    pub summary: RouteSummary,
    pub warnings: Vec<RouteWarning>,
}

pub struct SegmentEstimator {
    provider: Arc<dyn TravelTimeProvider>,
    cache: TtlCache<LookupKey, TravelEstimate>,
    max_concurrency: usize,
    lookup_timeout: Duration,
}

/// Both addresses trimmed, equal and non-empty.
pub fn is_zero_travel(current: &RouteStop, next: &RouteStop) -> bool {
    let a = current.address.trim();
    !a.is_empty() && a == next.address.trim()
}

/// Idle gap between the scheduled end of `current` and the start of `next`.
pub fn fallback_minutes(current: &RouteStop, next: &RouteStop) -> u32 {
    let end = clock_minutes(&current.end).unwrap_or(current.start_minutes);
    next.start_minutes.saturating_sub(end)
}

/// Whole minutes a real duration is billed as (partial minutes round up).
pub fn billable_minutes(duration_seconds: u64) -> u32 {
    u32::try_from(duration_seconds.div_ceil(60)).unwrap_or(u32::MAX)
}

/// Synthetic stop for the worker's starting point, placed at the first
/// visit's start so its leg has no fallback gap.
pub fn origin_stop(address: &str, first: &RouteStop) -> RouteStop {
    RouteStop {
        assignment_id: uuid::Uuid::nil(),
        label: ORIGIN_STOP_LABEL.to_string(),
        start: first.start.clone(),
        end: first.start.clone(),
        start_minutes: first.start_minutes,
        order: 0,
        address: address.trim().to_string(),
        postal_code: String::new(),
        city: String::new(),
    }
}

/// `high` when every leg needing a lookup got real data (or none needed
/// one), `low` when none did, `medium` otherwise.
pub fn summarize(segments: &[TravelSegment]) -> RouteSummary {
    let zero_travel_segments = segments.iter().filter(|s| s.is_zero_travel).count();
    let real_segments = segments
        .iter()
        .filter(|s| s.source == SegmentSource::Real)
        .count();
    let looked_up = segments.len() - zero_travel_segments;

    let confidence = if real_segments == looked_up {
        Confidence::High
    } else if real_segments == 0 {
        Confidence::Low
    } else {
        Confidence::Medium
    };

    RouteSummary {
        total_billable_minutes: segments
            .iter()
            .fold(0u32, |total, s| total.saturating_add(s.travel_time_minutes)),
        total_distance_meters: segments
            .iter()
            .filter_map(|s| s.distance_meters)
            .fold(0u64, |total, d| total.saturating_add(d)),
        confidence,
        real_segments,
        estimated_segments: looked_up - real_segments,
        zero_travel_segments,
    }
}

impl SegmentEstimator {
    pub fn new(
        provider: Arc<dyn TravelTimeProvider>,
        max_concurrency: usize,
        lookup_timeout: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            provider,
            cache: TtlCache::new(cache_ttl),
            max_concurrency: max_concurrency.max(1),
            lookup_timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Drop expired travel results.
    pub fn cleanup_cache(&self) {
        self.cache.cleanup();
    }

    /// Build the segments for `stops` (already in visit order).
    ///
    /// With an `origin` address a leading leg from the worker's starting point
    /// to the first stop is included. `refresh` skips cached lookups.
    /// Only cancellation aborts; provider trouble becomes warnings.
    pub async fn build_segments(
        &self,
        stops: &[RouteStop],
        origin: Option<&str>,
        mode: TravelMode,
        cancel: &CancellationToken,
        refresh: bool,
    ) -> Result<SegmentReport, RouteError> {
        let mut legs: Vec<(&RouteStop, &RouteStop)> = Vec::with_capacity(stops.len());
        let origin = match (origin.map(str::trim).filter(|o| !o.is_empty()), stops.first()) {
            (Some(address), Some(first)) => Some(origin_stop(address, first)),
            _ => None,
        };
        if let (Some(origin), Some(first)) = (origin.as_ref(), stops.first()) {
            legs.push((origin, first));
        }
        legs.extend(stops.windows(2).map(|pair| (&pair[0], &pair[1])));

        let mut segments = Vec::with_capacity(legs.len());
        let mut warnings = Vec::new();
        let mut pending: HashMap<LookupKey, Vec<usize>> = HashMap::new();
        let mut lookup_order: Vec<LookupKey> = Vec::new();

        for (index, (current, next)) in legs.iter().enumerate() {
            if is_zero_travel(current, next) {
                segments.push(TravelSegment {
                    from: (*current).clone(),
                    to: (*next).clone(),
                    travel_time_minutes: 0,
                    is_zero_travel: true,
                    duration_seconds: None,
                    distance_meters: None,
                    source: SegmentSource::Estimate,
                    fallback_minutes: 0,
                });
                continue;
            }

            let fallback = fallback_minutes(current, next);
            segments.push(TravelSegment {
                from: (*current).clone(),
                to: (*next).clone(),
                travel_time_minutes: fallback,
                is_zero_travel: false,
                duration_seconds: None,
                distance_meters: None,
                source: SegmentSource::Estimate,
                fallback_minutes: fallback,
            });

            if current.address.trim().is_empty() || next.address.trim().is_empty() {
                warnings.push(RouteWarning {
                    segment_index: Some(index),
                    warning_type: "MISSING_ADDRESS".to_string(),
                    message: format!(
                        "No address for '{}' or '{}', using scheduled gap",
                        current.label, next.label
                    ),
                });
                continue;
            }

            let key = (current.full_address(), next.full_address(), mode);
            if !refresh {
                if let Some(estimate) = self.cache.get(&key) {
                    apply_estimate(&mut segments[index], estimate);
                    continue;
                }
            }

            pending
                .entry(key.clone())
                .or_insert_with(|| {
                    lookup_order.push(key);
                    Vec::new()
                })
                .push(index);
        }

        if !lookup_order.is_empty() {
            debug!(
                "Looking up {} leg(s) via {} (max {} in flight)",
                lookup_order.len(),
                self.provider.name(),
                self.max_concurrency
            );

            let lookups = stream::iter(lookup_order)
                .map(|key| async move {
                    let result = self.lookup(&key).await;
                    (key, result)
                })
                .buffer_unordered(self.max_concurrency)
                .collect::<Vec<_>>();

            let results = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Segment lookups cancelled");
                    return Err(RouteError::Cancelled);
                }
                results = lookups => results,
            };

            for (key, result) in results {
                let indices = pending.remove(&key).unwrap_or_default();
                match result {
                    Ok(estimate) => {
                        self.cache.insert(key, estimate);
                        for index in indices {
                            apply_estimate(&mut segments[index], estimate);
                        }
                    }
                    Err(e) => {
                        warn!("Travel lookup {} -> {} failed: {}", key.0, key.1, e);
                        for index in indices {
                            warnings.push(RouteWarning {
                                segment_index: Some(index),
                                warning_type: e.warning_type().to_string(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(RouteError::Cancelled);
        }

        warnings.sort_by_key(|w| w.segment_index);
        let summary = summarize(&segments);

        Ok(SegmentReport {
            segments,
            summary,
            warnings,
        })
    }

    /// One provider call under the per-lookup timeout.
    async fn lookup(&self, key: &LookupKey) -> Result<TravelEstimate, ProviderError> {
        let (from, to, mode) = key;
        let estimate = match tokio::time::timeout(
            self.lookup_timeout,
            self.provider.estimate(from, to, *mode),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout(self.lookup_timeout)),
        };

        if estimate.duration_seconds == 0 {
            return Err(ProviderError::InvalidResponse(
                "zero travel duration between distinct addresses".to_string(),
            ));
        }

        if estimate.duration_seconds > MAX_TRAVEL_SECONDS {
            return Err(ProviderError::InvalidResponse(format!(
                "travel duration of {}s exceeds {}s",
                estimate.duration_seconds, MAX_TRAVEL_SECONDS
            )));
        }

        Ok(estimate)
    }
}

fn apply_estimate(segment: &mut TravelSegment, estimate: TravelEstimate) {
    segment.travel_time_minutes = billable_minutes(estimate.duration_seconds);
    segment.duration_seconds = Some(estimate.duration_seconds);
    segment.distance_meters = Some(estimate.distance_meters);
    segment.source = SegmentSource::Real;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    /// How the scripted provider answers for a destination address
    #[derive(Debug, Clone, Copy)]
    pub(crate) enum Answer {
        Seconds(u64),
        Fail,
        Hang,
        Zero,
        Slow(Duration, u64),
    }

    /// Provider answering per destination address, counting calls and
    /// the peak number of concurrent lookups
    pub(crate) struct ScriptedProvider {
        answers: HashMap<String, Answer>,
        default: Answer,
        pub(crate) calls: AtomicUsize,
        in_flight: AtomicUsize,
        pub(crate) peak_in_flight: AtomicUsize,
    }

    impl ScriptedProvider {
        pub(crate) fn new(default: Answer) -> Self {
            Self {
                answers: HashMap::new(),
                default,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with(mut self, to_address: &str, answer: Answer) -> Self {
            self.answers.insert(to_address.to_string(), answer);
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TravelTimeProvider for ScriptedProvider {
        async fn estimate(
            &self,
            _from_address: &str,
            to_address: &str,
            _mode: TravelMode,
        ) -> Result<TravelEstimate, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            let answer = self.answers.get(to_address).copied().unwrap_or(self.default);
            let result = match answer {
                Answer::Seconds(s) => Ok(TravelEstimate { duration_seconds: s, distance_meters: s * 10 }),
                Answer::Fail => Err(ProviderError::Unavailable("scripted failure".into())),
                Answer::Zero => Ok(TravelEstimate { duration_seconds: 0, distance_meters: 0 }),
                Answer::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(TravelEstimate { duration_seconds: 60, distance_meters: 600 })
                }
                Answer::Slow(delay, s) => {
                    tokio::time::sleep(delay).await;
                    Ok(TravelEstimate { duration_seconds: s, distance_meters: s * 10 })
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn name(&self) -> &str {
            "Scripted"
        }
    }

    pub(crate) fn stop(order: u32, address: &str, start: &str, end: &str) -> RouteStop {
        RouteStop {
            assignment_id: Uuid::new_v4(),
            label: format!("Cliente {}", order),
            start: start.into(),
            end: end.into(),
            start_minutes: clock_minutes(start).unwrap(),
            order,
            address: address.into(),
            postal_code: String::new(),
            city: String::new(),
        }
    }

    fn estimator(provider: Arc<ScriptedProvider>) -> SegmentEstimator {
        SegmentEstimator::new(provider, 4, Duration::from_millis(200), Duration::from_secs(60))
    }

    fn four_stops() -> Vec<RouteStop> {
        vec![
            stop(1, "Calle A 1", "08:00", "09:00"),
            stop(2, "Calle B 2", "09:30", "10:30"),
            stop(3, "Calle C 3", "11:00", "12:00"),
            stop(4, "Calle D 4", "12:20", "13:00"),
        ]
    }

    #[test]
    fn test_fallback_is_idle_gap() {
        let a = stop(1, "A", "08:00", "09:00");
        let b = stop(2, "B", "09:45", "10:00");
        assert_eq!(fallback_minutes(&a, &b), 45);
    }

    #[test]
    fn test_fallback_never_negative() {
        let a = stop(1, "A", "08:00", "10:00");
        let b = stop(2, "B", "09:30", "11:00");
        assert_eq!(fallback_minutes(&a, &b), 0);
    }

    #[test]
    fn test_billable_minutes_round_up() {
        assert_eq!(billable_minutes(60), 1);
        assert_eq!(billable_minutes(61), 2);
        assert_eq!(billable_minutes(754), 13);
    }

    #[test]
    fn test_zero_travel_requires_non_empty_address() {
        assert!(is_zero_travel(&stop(1, " Calle A 1", "08:00", "09:00"), &stop(2, "Calle A 1 ", "09:00", "10:00")));
        assert!(!is_zero_travel(&stop(1, "  ", "08:00", "09:00"), &stop(2, "", "09:00", "10:00")));
        assert!(!is_zero_travel(&stop(1, "Calle A 1", "08:00", "09:00"), &stop(2, "Calle A 2", "09:00", "10:00")));
    }

    #[tokio::test]
    async fn test_empty_and_single_stop_have_no_segments() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(600)));
        let estimator = estimator(provider.clone());
        let cancel = CancellationToken::new();

        let report = assert_ok!(estimator.build_segments(&[], None, TravelMode::Driving, &cancel, false).await);
        assert!(report.segments.is_empty());
        assert_eq!(report.summary.confidence, Confidence::High);

        let one = vec![stop(1, "Calle A 1", "08:00", "09:00")];
        let report = assert_ok!(estimator.build_segments(&one, None, TravelMode::Driving, &cancel, false).await);
        assert!(report.segments.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_same_address_is_zero_travel_without_lookup() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(600)));
        let estimator = estimator(provider.clone());
        let stops = vec![
            stop(1, "Calle A 1", "09:00", "10:00"),
            stop(2, "Calle A 1", "10:15", "11:00"),
        ];

        let report = estimator
            .build_segments(&stops, None, TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.segments.len(), 1);
        assert!(report.segments[0].is_zero_travel);
        assert_eq!(report.segments[0].travel_time_minutes, 0);
        assert_eq!(provider.calls(), 0);
        assert_eq!(report.summary.zero_travel_segments, 1);
        assert_eq!(report.summary.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn test_all_lookups_succeed_is_high_confidence() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(600)).with("Calle C 3", Answer::Seconds(754)));
        let estimator = estimator(provider.clone());

        let report = estimator
            .build_segments(&four_stops(), None, TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.segments.len(), 3);
        assert!(report.segments.iter().all(|s| s.source == SegmentSource::Real));
        assert_eq!(report.segments[1].travel_time_minutes, 13);
        assert_eq!(report.segments[1].duration_seconds, Some(754));
        assert_eq!(report.summary.total_billable_minutes, 10 + 13 + 10);
        assert_eq!(report.summary.total_distance_meters, 6000 + 7540 + 6000);
        assert_eq!(report.summary.confidence, Confidence::High);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_one_timeout_of_three_is_medium_confidence() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(600)).with("Calle C 3", Answer::Hang));
        let estimator = estimator(provider);

        let report = estimator
            .build_segments(&four_stops(), None, TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.segments.len(), 3);
        let sources: Vec<_> = report.segments.iter().map(|s| s.source).collect();
        assert_eq!(
            sources,
            vec![SegmentSource::Real, SegmentSource::Estimate, SegmentSource::Real]
        );
        assert_eq!(report.segments[1].travel_time_minutes, 30);
        assert_eq!(report.summary.confidence, Confidence::Medium);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].segment_index, Some(1));
        assert_eq!(report.warnings[0].warning_type, "PROVIDER_TIMEOUT");
    }

    #[tokio::test]
    async fn test_all_lookups_fail_uses_fallback_gaps() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Fail));
        let estimator = estimator(provider);
        let stops = four_stops();

        let report = estimator
            .build_segments(&stops, None, TravelMode::Walking, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.summary.confidence, Confidence::Low);
        for (segment, pair) in report.segments.iter().zip(stops.windows(2)) {
            assert_eq!(segment.source, SegmentSource::Estimate);
            assert_eq!(segment.travel_time_minutes, fallback_minutes(&pair[0], &pair[1]));
            assert_eq!(segment.distance_meters, None);
        }
        assert_eq!(report.summary.total_distance_meters, 0);
        assert_eq!(report.summary.total_billable_minutes, 30 + 30 + 20);
        assert_eq!(report.warnings.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_duration_is_treated_as_invalid() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Zero));
        let estimator = estimator(provider);
        let stops = vec![stop(1, "Calle A 1", "08:00", "09:00"), stop(2, "Calle B 2", "09:20", "10:00")];

        let report = estimator
            .build_segments(&stops, None, TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.segments[0].source, SegmentSource::Estimate);
        assert_eq!(report.segments[0].travel_time_minutes, 20);
        assert_eq!(report.warnings[0].warning_type, "PROVIDER_INVALID");
    }

    #[tokio::test]
    async fn test_absurd_duration_is_treated_as_invalid() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(u64::MAX / 10)));
        let estimator = estimator(provider);
        let stops = vec![
            stop(1, "Calle A 1", "08:00", "09:00"),
            stop(2, "Calle B 2", "09:20", "10:00"),
            stop(3, "Calle C 3", "10:30", "11:00"),
        ];

        let report = estimator
            .build_segments(&stops, None, TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert!(report.segments.iter().all(|s| s.source == SegmentSource::Estimate));
        assert_eq!(report.summary.total_billable_minutes, 20 + 30);
        assert_eq!(report.summary.total_distance_meters, 0);
        assert_eq!(report.summary.confidence, Confidence::Low);
        assert!(report.warnings.iter().all(|w| w.warning_type == "PROVIDER_INVALID"));
    }

    #[test]
    fn test_summary_totals_saturate() {
        let a = stop(1, "Calle A 1", "08:00", "09:00");
        let b = stop(2, "Calle B 2", "09:20", "10:00");
        let huge = TravelSegment {
            from: a,
            to: b,
            travel_time_minutes: u32::MAX,
            is_zero_travel: false,
            duration_seconds: Some(u64::MAX),
            distance_meters: Some(u64::MAX),
            source: SegmentSource::Real,
            fallback_minutes: 20,
        };

        let summary = summarize(&[huge.clone(), huge]);
        assert_eq!(summary.total_billable_minutes, u32::MAX);
        assert_eq!(summary.total_distance_meters, u64::MAX);
    }

    #[tokio::test]
    async fn test_missing_address_skips_lookup() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(600)));
        let estimator = estimator(provider.clone());
        let stops = vec![stop(1, "", "08:00", "09:00"), stop(2, "Calle B 2", "09:20", "10:00")];

        let report = estimator
            .build_segments(&stops, None, TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 0);
        assert!(!report.segments[0].is_zero_travel);
        assert_eq!(report.segments[0].travel_time_minutes, 20);
        assert_eq!(report.warnings[0].warning_type, "MISSING_ADDRESS");
        assert_eq!(report.summary.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn test_repeated_legs_share_one_lookup() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(300)));
        let estimator = estimator(provider.clone());
        let stops = vec![
            stop(1, "Calle A 1", "08:00", "09:00"),
            stop(2, "Calle B 2", "09:30", "10:00"),
            stop(3, "Calle A 1", "10:30", "11:00"),
            stop(4, "Calle B 2", "11:30", "12:00"),
        ];

        let report = estimator
            .build_segments(&stops, None, TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        // A->B twice, B->A once
        assert_eq!(provider.calls(), 2);
        assert!(report.segments.iter().all(|s| s.source == SegmentSource::Real));
    }

    #[tokio::test]
    async fn test_cached_results_skip_provider_unless_refresh() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(600)));
        let estimator = estimator(provider.clone());
        let cancel = CancellationToken::new();
        let stops = four_stops();

        let first = estimator.build_segments(&stops, None, TravelMode::Driving, &cancel, false).await.unwrap();
        assert_eq!(provider.calls(), 3);

        let second = estimator.build_segments(&stops, None, TravelMode::Driving, &cancel, false).await.unwrap();
        assert_eq!(provider.calls(), 3);
        assert_eq!(first, second);

        estimator.build_segments(&stops, None, TravelMode::Driving, &cancel, true).await.unwrap();
        assert_eq!(provider.calls(), 6);

        // Mode is part of the key
        estimator.build_segments(&stops, None, TravelMode::Transit, &cancel, false).await.unwrap();
        assert_eq!(provider.calls(), 9);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Fail));
        let estimator = estimator(provider.clone());
        let cancel = CancellationToken::new();
        let stops = four_stops();

        estimator.build_segments(&stops, None, TravelMode::Driving, &cancel, false).await.unwrap();
        estimator.build_segments(&stops, None, TravelMode::Driving, &cancel, false).await.unwrap();
        assert_eq!(provider.calls(), 6);
    }

    #[tokio::test]
    async fn test_lookups_respect_concurrency_cap() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Slow(Duration::from_millis(20), 120)));
        let estimator = SegmentEstimator::new(provider.clone(), 2, Duration::from_secs(5), Duration::ZERO);

        let stops: Vec<_> = (0..10u32)
            .map(|i| {
                let start = format!("{:02}:00", 8 + i);
                let end = format!("{:02}:30", 8 + i);
                stop(i + 1, &format!("Calle {}", i), &start, &end)
            })
            .collect();

        let report = estimator
            .build_segments(&stops, None, TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.segments.len(), 9);
        assert_eq!(provider.calls(), 9);
        let peak = provider.peak_in_flight.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 2, "peak in-flight lookups was {}", peak);

        // Segment order follows stop order, not completion order
        for (i, segment) in report.segments.iter().enumerate() {
            assert_eq!(segment.from.order, i as u32 + 1);
            assert_eq!(segment.to.order, i as u32 + 2);
        }
    }

    #[tokio::test]
    async fn test_cancellation_aborts_pending_lookups() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Slow(Duration::from_secs(5), 600)));
        let estimator = SegmentEstimator::new(provider, 4, Duration::from_secs(10), Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let result = estimator
            .build_segments(&four_stops(), None, TravelMode::Driving, &cancel, false)
            .await;

        let err = assert_err!(result);
        assert!(matches!(err, RouteError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_origin_adds_leading_leg() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(900)));
        let estimator = estimator(provider.clone());
        let stops = four_stops();

        let report = estimator
            .build_segments(&stops, Some(" Plaza Mayor 1 "), TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.segments.len(), 4);
        let first = &report.segments[0];
        assert_eq!(first.from.order, 0);
        assert_eq!(first.from.label, "Inicio");
        assert_eq!(first.from.address, "Plaza Mayor 1");
        assert_eq!(first.to.order, 1);
        assert_eq!(first.fallback_minutes, 0);
        assert_eq!(first.travel_time_minutes, 15);
    }

    #[tokio::test]
    async fn test_blank_origin_is_ignored() {
        let provider = Arc::new(ScriptedProvider::new(Answer::Seconds(900)));
        let estimator = estimator(provider);

        let report = estimator
            .build_segments(&four_stops(), Some("   "), TravelMode::Driving, &CancellationToken::new(), false)
            .await
            .unwrap();

        assert_eq!(report.segments.len(), 3);
    }

    #[test]
    fn test_summarize_counts() {
        let a = stop(1, "A", "08:00", "09:00");
        let b = stop(2, "B", "09:30", "10:00");
        let segment = |source, zero| TravelSegment {
            from: a.clone(),
            to: b.clone(),
            travel_time_minutes: if zero { 0 } else { 10 },
            is_zero_travel: zero,
            duration_seconds: None,
            distance_meters: None,
            source,
            fallback_minutes: 30,
        };

        let summary = summarize(&[
            segment(SegmentSource::Real, false),
            segment(SegmentSource::Estimate, false),
            segment(SegmentSource::Estimate, true),
        ]);

        assert_eq!(summary.real_segments, 1);
        assert_eq!(summary.estimated_segments, 1);
        assert_eq!(summary.zero_travel_segments, 1);
        assert_eq!(summary.total_billable_minutes, 20);
        assert_eq!(summary.confidence, Confidence::Medium);
    }
}
