//! Provider selection by priority and freshness

use crate::{IntervalDataPoints, SourceDataMap};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::trace;
use wxfuse_core::{DataPoint, DataPointSource};

/// Default maximum age for a provider's data to count as fresh
pub const DEFAULT_FRESHNESS_HOURS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSelectionPolicy {
    pub freshness: Duration,
}

impl SourceSelectionPolicy {
    pub fn new(freshness: Duration) -> Self {
        Self { freshness }
    }
}

impl Default for SourceSelectionPolicy {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_FRESHNESS_HOURS))
    }
}

/// The contribution covering `now`, else the one nearest to it.
/// Ties go to the most recently produced value.
pub fn current_data_point(data_points: &IntervalDataPoints, now: DateTime<Utc>) -> Option<&DataPoint> {
    data_points
        .iter()
        .min_by(|(a_interval, a), (b_interval, b)| {
            a_interval
                .distance_to(now)
                .cmp(&b_interval.distance_to(now))
                .then_with(|| b.source_datetime.cmp(&a.source_datetime))
        })
        .map(|(_, dp)| dp)
}

/// Choose the authoritative provider for one field.
///
/// Walks sources from most to least trusted and returns the first whose
/// current contribution is no older than the policy's freshness window.
/// When every source is stale the most trusted one is returned anyway.
pub fn get_best_data_point_source(
    source_map: &SourceDataMap,
    now: DateTime<Utc>,
    policy: &SourceSelectionPolicy,
) -> Option<Arc<DataPointSource>> {
    let mut ranked: Vec<(&Arc<DataPointSource>, &IntervalDataPoints)> = source_map.iter().collect();
    ranked.sort_by(|(a, _), (b, _)| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

    let fresh = ranked.iter().find(|(source, points)| {
        let Some(dp) = current_data_point(points, now) else {
            return false;
        };
        let age = now - dp.source_datetime;
        trace!(source = %source.id, age_secs = age.num_seconds(), "Checking source freshness");
        age <= policy.freshness
    });

    fresh
        .or_else(|| ranked.first())
        .map(|(source, _)| Arc::clone(source))
}
