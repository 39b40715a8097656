//! Per-interval aggregation of multi-source weather records

use crate::combine::{
    aggregate_boolean_data_points, aggregate_numeric_data_points, aggregate_string_data_points,
    aggregate_time_data_points,
};
use crate::selection::{get_best_data_point_source, SourceSelectionPolicy};
use crate::{AggregateResult, IntervalDataPoints, SourceDataMap};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use wxfuse_core::{
    DataPoint, DataPointKind, DataPointSource, TimeInterval, WeatherData, WeatherDataClass,
    WeatherField, WeatherRecord,
};

/// Target interval and the record being assembled for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalWeatherData {
    pub interval: TimeInterval,
    pub data: WeatherData,
}

/// Bookkeeping for one field: every source's contributions and the owner
#[derive(Debug, Clone, Default)]
pub struct FieldSourceData {
    pub sources: SourceDataMap,
    pub source: Option<Arc<DataPointSource>>,
}

/// Builds one canonical record for a target interval from many sources
#[derive(Debug)]
pub struct AggregatedWeatherData {
    interval_data: IntervalWeatherData,
    source_data: HashMap<WeatherField, FieldSourceData>,
    data_class: WeatherDataClass,
    now: DateTime<Utc>,
    policy: SourceSelectionPolicy,
}

impl AggregatedWeatherData {
    /// Start an empty aggregate with bookkeeping for every field of `data_class`
    pub fn from_time_interval(
        interval: TimeInterval,
        data_class: WeatherDataClass,
        now: DateTime<Utc>,
        policy: SourceSelectionPolicy,
    ) -> Self {
        let source_data = data_class
            .fields()
            .iter()
            .map(|field| (*field, FieldSourceData::default()))
            .collect();

        Self {
            interval_data: IntervalWeatherData {
                interval,
                data: data_class.empty_record(),
            },
            source_data,
            data_class,
            now,
            policy,
        }
    }

    pub fn interval(&self) -> &TimeInterval {
        &self.interval_data.interval
    }

    pub fn data_class(&self) -> WeatherDataClass {
        self.data_class
    }

    /// Provider currently owning `field`
    pub fn field_source(&self, field: WeatherField) -> Option<&Arc<DataPointSource>> {
        self.source_data.get(&field).and_then(|s| s.source.as_ref())
    }

    pub fn field_source_data(&self, field: WeatherField) -> Option<&FieldSourceData> {
        self.source_data.get(&field)
    }

    /// Fold in every populated field of a source record valid over `source_interval`.
    ///
    /// Returns how many fields were accepted.
    #[instrument(skip(self, record), fields(class = ?self.data_class))]
    pub fn add_source_data<R: WeatherRecord>(
        &mut self,
        source_interval: TimeInterval,
        record: &R,
    ) -> usize {
        record
            .populated_fields()
            .into_iter()
            .filter(|(field, dp)| self.add_data_point(*field, source_interval, (*dp).clone()))
            .count()
    }

    /// Fold in one data point; false when it cannot contribute to this aggregate
    pub fn add_data_point(
        &mut self,
        field: WeatherField,
        source_interval: TimeInterval,
        data_point: DataPoint,
    ) -> bool {
        if data_point.kind() != field.kind() {
            debug!(%field, kind = ?data_point.kind(), "Skipping data point of wrong kind");
            return false;
        }
        if let Some(value) = data_point.as_numeric() {
            let finite = [value.quantity_ave, value.min(), value.max()]
                .iter()
                .all(|q| q.magnitude.is_finite());
            if !finite {
                debug!(%field, source = %data_point.source().id, "Skipping non-finite reading");
                return false;
            }
        }
        if self.interval_data.interval.overlap_seconds(&source_interval) <= 0.0 {
            return false;
        }
        let Some(entry) = self.source_data.get_mut(&field) else {
            return false;
        };

        entry
            .sources
            .entry(data_point.source().clone())
            .or_default()
            .insert(source_interval, data_point);
        entry.source = get_best_data_point_source(&entry.sources, self.now, &self.policy);
        true
    }

    /// Provider that should be authoritative among `source_map`
    pub fn get_best_data_point_source(
        &self,
        source_map: &SourceDataMap,
    ) -> Option<Arc<DataPointSource>> {
        get_best_data_point_source(source_map, self.now, &self.policy)
    }

    pub fn aggregate_numeric_data_points(
        &self,
        data_points: &IntervalDataPoints,
    ) -> AggregateResult<DataPoint> {
        aggregate_numeric_data_points(&self.interval_data.interval, data_points)
    }

    pub fn aggregate_boolean_data_points(
        &self,
        data_points: &IntervalDataPoints,
    ) -> AggregateResult<DataPoint> {
        aggregate_boolean_data_points(&self.interval_data.interval, data_points)
    }

    pub fn aggregate_string_data_points(
        &self,
        data_points: &IntervalDataPoints,
    ) -> AggregateResult<DataPoint> {
        aggregate_string_data_points(&self.interval_data.interval, data_points)
    }

    pub fn aggregate_time_data_points(
        &self,
        data_points: &IntervalDataPoints,
    ) -> AggregateResult<DataPoint> {
        aggregate_time_data_points(&self.interval_data.interval, data_points)
    }

    fn aggregate_field(&self, field: WeatherField) -> Option<DataPoint> {
        let entry = self.source_data.get(&field)?;
        let owner = entry.source.as_ref()?;
        let points = entry.sources.get(owner)?;

        let result = match field.kind() {
            DataPointKind::Numeric => self.aggregate_numeric_data_points(points),
            DataPointKind::Boolean => self.aggregate_boolean_data_points(points),
            DataPointKind::String => self.aggregate_string_data_points(points),
            DataPointKind::Time => self.aggregate_time_data_points(points),
        };

        match result {
            Ok(dp) => Some(dp),
            Err(e) => {
                warn!(%field, source = %owner.id, "Dropping field: {}", e);
                None
            }
        }
    }

    /// Aggregate every field from its owning source and return the record
    #[instrument(skip(self), fields(interval = %self.interval_data.interval))]
    pub fn finalize(mut self) -> IntervalWeatherData {
        for field in self.data_class.fields() {
            let value = self.aggregate_field(*field);
            if let Err(e) = self.interval_data.data.set(*field, value) {
                warn!(%field, "Cannot set aggregated field: {}", e);
            }
        }
        debug!(
            fields = self.interval_data.data.populated_fields().len(),
            "Aggregated interval"
        );
        self.interval_data
    }
}
