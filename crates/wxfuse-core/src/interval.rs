//! Half-open time ranges used for overlap weighting

use crate::{ModelError, ModelResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

/// Half-open `[start, end)` range of UTC instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// Create an interval, rejecting `start > end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ModelResult<Self> {
        if start > end {
            return Err(ModelError::InvalidInterval {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Interval of `duration` starting at `start`
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> ModelResult<Self> {
        Self::new(start, start + duration)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Seconds shared with `other`, zero when disjoint
    pub fn overlap_seconds(&self, other: &TimeInterval) -> f64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end <= start {
            return 0.0;
        }
        (end - start).num_milliseconds() as f64 / 1000.0
    }

    /// Distance from `instant` to the nearest point of the interval
    pub fn distance_to(&self, instant: DateTime<Utc>) -> Duration {
        if instant < self.start {
            self.start - instant
        } else if instant >= self.end {
            instant - self.end
        } else {
            Duration::zero()
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
