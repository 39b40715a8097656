//! Rolling window of provider readings

use crate::{IngestError, IngestResult, SourceReading};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Keeps one provider's readings that can still overlap an aggregation window
pub struct ReadingBuffer {
    window: Duration,
    readings: VecDeque<SourceReading>,
    max_readings: usize,
}

impl ReadingBuffer {
    pub fn new(window: Duration, max_readings: usize) -> Self {
        Self {
            window,
            readings: VecDeque::with_capacity(max_readings),
            max_readings,
        }
    }

    /// Add a reading; fails once the buffer is full
    pub fn push(&mut self, reading: SourceReading) -> IngestResult<()> {
        if self.readings.len() >= self.max_readings {
            return Err(IngestError::BufferOverflow);
        }
        self.readings.push_back(reading);
        Ok(())
    }

    /// Drop readings that ended before `now - window`; returns how many
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let before = self.readings.len();
        self.readings.retain(|r| r.interval.end() > cutoff);
        before - self.readings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceReading> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
