//! Daily weather tracker

use crate::stats::{update_bundle, StatBundle, StatRecord, Statistic, MIN_MAX};
use crate::{TrackerError, TrackerResult};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use wxfuse_core::{
    Clock, DataPoint, DataPointSource, Quantity, Station, SystemClock, Unit, WeatherConditionsData,
    WeatherField, WeatherRecord,
};
use wxfuse_store::StatsStore;

pub const TRACKER_SOURCE_ID: &str = "daily_weather_tracker";
pub const DEFAULT_KEY_PREFIX: &str = "daily_weather";

/// Priority given to tracker-derived values; below any real provider
pub const TRACKER_SOURCE_PRIORITY: i32 = 1000;

const DEFAULT_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// A field whose daily extrema are tracked
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedField {
    pub field: WeatherField,
    /// Unit values are normalized to before comparison
    pub unit: Unit,
    pub today_min: Option<WeatherField>,
    pub today_max: Option<WeatherField>,
}

pub const DEFAULT_TRACKED_FIELDS: [TrackedField; 1] = [TrackedField {
    field: WeatherField::Temperature,
    unit: Unit::Celsius,
    today_min: Some(WeatherField::TemperatureMinToday),
    today_max: Some(WeatherField::TemperatureMaxToday),
}];

/// Everything recorded for one location on one local date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub fields: BTreeMap<String, StatBundle>,
}

pub struct DailyWeatherTracker {
    store: Arc<dyn StatsStore>,
    timezone: Tz,
    clock: Arc<dyn Clock>,
    key_prefix: String,
    ttl: Option<Duration>,
    tracked_fields: Vec<TrackedField>,
    source: Arc<DataPointSource>,
}

impl DailyWeatherTracker {
    pub fn new(store: Arc<dyn StatsStore>, timezone: Tz) -> Self {
        Self {
            store,
            timezone,
            clock: Arc::new(SystemClock),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            ttl: Some(DEFAULT_TTL),
            tracked_fields: DEFAULT_TRACKED_FIELDS.to_vec(),
            source: Arc::new(DataPointSource::new(
                TRACKER_SOURCE_ID,
                "Daily Weather Tracker",
                "DWT",
                TRACKER_SOURCE_PRIORITY,
            )),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Expiry for stored bundles; `None` keeps them until cleared
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_tracked_fields(mut self, fields: Vec<TrackedField>) -> Self {
        self.tracked_fields = fields;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn tracked_fields(&self) -> &[TrackedField] {
        &self.tracked_fields
    }

    /// Calendar date of `timestamp` in the tracker's timezone
    pub fn local_date(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        timestamp.with_timezone(&self.timezone).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(self.clock.now())
    }

    pub fn cache_key(&self, location_key: &str, date: NaiveDate, field_name: &str) -> String {
        format!(
            "{}:{}:{}:{}",
            self.key_prefix,
            location_key,
            date.format("%Y-%m-%d"),
            field_name
        )
    }

    fn load_bundle(&self, key: &str) -> TrackerResult<Option<StatBundle>> {
        match self.store.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| TrackerError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Record every tracked field present in a conditions record.
    ///
    /// Returns how many fields changed a stored statistic.
    #[instrument(skip(self, conditions))]
    pub fn record_weather_conditions(
        &self,
        conditions: &WeatherConditionsData,
        location_key: &str,
    ) -> TrackerResult<usize> {
        let mut changed = 0;
        for tracked in &self.tracked_fields {
            let Some(dp) = conditions.get(tracked.field) else {
                continue;
            };
            let Some(value) = dp.as_numeric() else {
                debug!(field = %tracked.field, "Skipping non-numeric observation");
                continue;
            };
            let quantity = match value.quantity_ave.to(tracked.unit) {
                Ok(q) => q,
                Err(e) => {
                    debug!(field = %tracked.field, "Skipping observation: {}", e);
                    continue;
                }
            };
            if self.record_field_value(
                location_key,
                tracked.field.as_str(),
                quantity.magnitude,
                quantity.unit,
                dp.source_datetime,
                &MIN_MAX,
            )? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Fold one scalar reading into the bundle for its local date.
    ///
    /// Readings are converted to the unit already stored for that day and
    /// skipped when they cannot be. Returns true when any statistic was
    /// replaced.
    #[instrument(skip(self, track_stats))]
    pub fn record_field_value(
        &self,
        location_key: &str,
        field_name: &str,
        value: f64,
        unit: Unit,
        timestamp: DateTime<Utc>,
        track_stats: &[Statistic],
    ) -> TrackerResult<bool> {
        if !value.is_finite() {
            debug!("Skipping non-finite reading");
            return Ok(false);
        }

        let key = self.cache_key(location_key, self.local_date(timestamp), field_name);
        let mut bundle = self.load_bundle(&key)?.unwrap_or_default();

        // Compare in the unit the day's bundle already uses
        let reading = Quantity::new(value, unit);
        let quantity = match bundle.values().next().map(|r| Unit::from_symbol(&r.units)) {
            Some(Ok(stored)) => match reading.to(stored) {
                Ok(q) => q,
                Err(e) => {
                    debug!("Skipping reading: {}", e);
                    return Ok(false);
                }
            },
            _ => reading,
        };
        let observation = StatRecord {
            value: quantity.magnitude,
            units: quantity.unit.symbol().to_string(),
            timestamp,
        };

        if !update_bundle(&mut bundle, track_stats, &observation) {
            return Ok(false);
        }

        let raw = serde_json::to_string(&bundle)?;
        self.store.set(&key, &raw, self.ttl)?;
        debug!(key = %key, "Updated daily statistics");
        Ok(true)
    }

    fn to_data_point(&self, location_key: &str, record: &StatRecord) -> Option<DataPoint> {
        let unit = match Unit::from_symbol(&record.units) {
            Ok(unit) => unit,
            Err(e) => {
                warn!("Ignoring stored statistic: {}", e);
                return None;
            }
        };
        let station = Arc::new(Station::new(self.source.clone(), location_key));
        Some(DataPoint::numeric(
            station,
            record.timestamp,
            Quantity::new(record.value, unit),
        ))
    }

    /// Today's min and max for a field as tracker-sourced data points
    pub fn get_field_min_max_today(
        &self,
        location_key: &str,
        field_name: &str,
    ) -> TrackerResult<(Option<DataPoint>, Option<DataPoint>)> {
        let key = self.cache_key(location_key, self.today(), field_name);
        let Some(bundle) = self.load_bundle(&key)? else {
            return Ok((None, None));
        };
        let stat = |s: Statistic| {
            bundle
                .get(&s)
                .and_then(|record| self.to_data_point(location_key, record))
        };
        Ok((stat(Statistic::Min), stat(Statistic::Max)))
    }

    pub fn get_temperature_min_max_today(
        &self,
        location_key: &str,
    ) -> TrackerResult<(Option<DataPoint>, Option<DataPoint>)> {
        self.get_field_min_max_today(location_key, WeatherField::Temperature.as_str())
    }

    /// Fill missing today-min/max fields from tracked statistics.
    ///
    /// Fields already populated by a provider are left untouched.
    /// Returns how many fields were filled.
    #[instrument(skip(self, conditions))]
    pub fn populate_daily_fallbacks(
        &self,
        conditions: &mut WeatherConditionsData,
        location_key: &str,
    ) -> TrackerResult<usize> {
        let mut filled = 0;
        for tracked in &self.tracked_fields {
            let missing = |slot: Option<WeatherField>| {
                slot.filter(|f| {
                    WeatherConditionsData::FIELDS.contains(f) && conditions.get(*f).is_none()
                })
            };
            let (min_slot, max_slot) = (missing(tracked.today_min), missing(tracked.today_max));
            if min_slot.is_none() && max_slot.is_none() {
                continue;
            }

            let (min, max) = self.get_field_min_max_today(location_key, tracked.field.as_str())?;
            for (slot, value) in [(min_slot, min), (max_slot, max)] {
                if let (Some(field), Some(dp)) = (slot, value) {
                    if let Err(e) = conditions.set(field, Some(dp)) {
                        warn!(%field, "Cannot fill daily fallback: {}", e);
                        continue;
                    }
                    filled += 1;
                }
            }
        }
        Ok(filled)
    }

    /// Remove today's statistics for one field
    #[instrument(skip(self))]
    pub fn clear_today(&self, location_key: &str, field_name: &str) -> TrackerResult<bool> {
        let key = self.cache_key(location_key, self.today(), field_name);
        let removed = self.store.delete(&key)?;
        if removed {
            info!(key = %key, "Cleared daily statistics");
        }
        Ok(removed)
    }

    /// Drop expired bundles from the backing store
    pub fn purge_expired(&self) -> TrackerResult<usize> {
        let purged = self.store.purge_expired()?;
        if purged > 0 {
            debug!(purged, "Purged expired daily statistics");
        }
        Ok(purged)
    }

    /// All tracked statistics for a location on a local date
    pub fn get_daily_summary(&self, location_key: &str, date: NaiveDate) -> TrackerResult<DailySummary> {
        let mut fields = BTreeMap::new();
        for tracked in &self.tracked_fields {
            let name = tracked.field.as_str();
            if let Some(bundle) = self.load_bundle(&self.cache_key(location_key, date, name))? {
                fields.insert(name.to_string(), bundle);
            }
        }
        Ok(DailySummary { date, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use wxfuse_core::FixedClock;
    use wxfuse_store::{MemoryStore, StoreError, StoreResult};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn tracker() -> (DailyWeatherTracker, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(noon()));
        let tracker = DailyWeatherTracker::new(Arc::new(MemoryStore::new()), chrono_tz::UTC)
            .with_clock(clock.clone());
        (tracker, clock)
    }

    fn conditions(temp: Option<Quantity>, at: DateTime<Utc>) -> WeatherConditionsData {
        let source = Arc::new(DataPointSource::new("nws", "NWS", "NWS", 1));
        let station = Arc::new(Station::new(source, "KSEA"));
        WeatherConditionsData {
            temperature: temp.map(|q| DataPoint::numeric(station, at, q)),
            ..Default::default()
        }
    }

    fn celsius(dp: &Option<DataPoint>) -> Option<f64> {
        dp.as_ref()
            .and_then(|dp| dp.as_numeric())
            .map(|v| v.quantity_ave.magnitude)
    }

    struct UnavailableStore;

    impl StatsStore for UnavailableStore {
        fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn delete(&self, _key: &str) -> StoreResult<bool> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn purge_expired(&self) -> StoreResult<usize> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn test_cache_key_format() {
        let (tracker, _) = tracker();
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        insta::assert_snapshot!(
            tracker.cache_key("47.61,-122.33", date, "temperature"),
            @"daily_weather:47.61,-122.33:2024-03-10:temperature"
        );
    }

    #[test]
    fn test_record_sequence_min_max() {
        let (tracker, _) = tracker();
        for (i, t) in [20.0, 25.0, 18.0, 30.0, 22.0].iter().enumerate() {
            let at = noon() - ChronoDuration::minutes(50 - i as i64 * 10);
            let c = conditions(Some(Quantity::new(*t, Unit::Celsius)), at);
            tracker.record_weather_conditions(&c, "home").unwrap();
        }

        let (min, max) = tracker.get_temperature_min_max_today("home").unwrap();
        assert_eq!(celsius(&min), Some(18.0));
        assert_eq!(celsius(&max), Some(30.0));
        let min = min.unwrap();
        assert_eq!(min.source().id, TRACKER_SOURCE_ID);
        assert_eq!(min.source().priority, TRACKER_SOURCE_PRIORITY);
        assert_eq!(min.source_datetime, noon() - ChronoDuration::minutes(30));
    }

    #[test]
    fn test_normalizes_to_celsius() {
        let (tracker, _) = tracker();
        let c = conditions(Some(Quantity::new(50.0, Unit::Fahrenheit)), noon());
        assert_eq!(tracker.record_weather_conditions(&c, "home").unwrap(), 1);

        let (min, _) = tracker.get_temperature_min_max_today("home").unwrap();
        let min = min.unwrap();
        let value = min.as_numeric().unwrap().quantity_ave;
        assert_eq!(value.unit, Unit::Celsius);
        assert!((value.magnitude - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_or_malformed_input_is_skipped() {
        let (tracker, _) = tracker();
        assert_eq!(tracker.record_weather_conditions(&conditions(None, noon()), "home").unwrap(), 0);

        let nan = conditions(Some(Quantity::new(f64::NAN, Unit::Celsius)), noon());
        assert_eq!(tracker.record_weather_conditions(&nan, "home").unwrap(), 0);

        let wrong_unit = conditions(Some(Quantity::new(1013.0, Unit::Hectopascal)), noon());
        assert_eq!(tracker.record_weather_conditions(&wrong_unit, "home").unwrap(), 0);

        assert_eq!(tracker.get_temperature_min_max_today("home").unwrap(), (None, None));
    }

    #[test]
    fn test_field_value_units_round_trip() {
        let (tracker, _) = tracker();
        assert!(tracker
            .record_field_value("home", "temperature", 41.0, Unit::Fahrenheit, noon(), &MIN_MAX)
            .unwrap());
        assert!(tracker
            .record_field_value("home", "temperature", 2.0, Unit::Celsius, noon(), &MIN_MAX)
            .unwrap());
        assert!(!tracker
            .record_field_value("home", "temperature", 990.0, Unit::Hectopascal, noon(), &MIN_MAX)
            .unwrap());

        let (min, max) = tracker.get_temperature_min_max_today("home").unwrap();
        let min = min.unwrap().as_numeric().unwrap().quantity_ave;
        let max = max.unwrap().as_numeric().unwrap().quantity_ave;
        assert_eq!(min.unit, Unit::Fahrenheit);
        assert!((min.magnitude - 35.6).abs() < 1e-9);
        assert_eq!(max, Quantity::new(41.0, Unit::Fahrenheit));

        let summary = tracker.get_daily_summary("home", tracker.today()).unwrap();
        assert_eq!(summary.fields["temperature"][&Statistic::Min].units, "°F");
    }

    #[test]
    fn test_new_day_starts_fresh() {
        let (tracker, clock) = tracker();
        tracker
            .record_field_value("home", "temperature", 5.0, Unit::Celsius, noon(), &MIN_MAX)
            .unwrap();

        let tomorrow = noon() + ChronoDuration::days(1);
        clock.set(tomorrow);
        assert_eq!(tracker.get_temperature_min_max_today("home").unwrap(), (None, None));

        tracker
            .record_field_value("home", "temperature", 15.0, Unit::Celsius, tomorrow, &MIN_MAX)
            .unwrap();
        let (min, max) = tracker.get_temperature_min_max_today("home").unwrap();
        assert_eq!(celsius(&min), Some(15.0));
        assert_eq!(celsius(&max), Some(15.0));
    }

    #[test]
    fn test_locations_are_independent() {
        let (tracker, _) = tracker();
        tracker
            .record_field_value("home", "temperature", 5.0, Unit::Celsius, noon(), &MIN_MAX)
            .unwrap();
        tracker
            .record_field_value("cabin", "temperature", -3.0, Unit::Celsius, noon(), &MIN_MAX)
            .unwrap();

        let (min, _) = tracker.get_temperature_min_max_today("home").unwrap();
        assert_eq!(celsius(&min), Some(5.0));
    }

    #[test]
    fn test_fallbacks_fill_only_gaps() {
        let (tracker, _) = tracker();
        tracker
            .record_field_value("home", "temperature", 4.0, Unit::Celsius, noon(), &MIN_MAX)
            .unwrap();
        tracker
            .record_field_value("home", "temperature", 16.0, Unit::Celsius, noon(), &MIN_MAX)
            .unwrap();

        let mut c = conditions(Some(Quantity::new(10.0, Unit::Celsius)), noon());
        let provider_max = DataPoint::numeric(
            c.temperature.as_ref().unwrap().station.clone(),
            noon(),
            Quantity::new(19.0, Unit::Celsius),
        );
        c.temperature_max_today = Some(provider_max.clone());

        assert_eq!(tracker.populate_daily_fallbacks(&mut c, "home").unwrap(), 1);
        assert_eq!(celsius(&c.temperature_min_today), Some(4.0));
        assert_eq!(c.temperature_max_today, Some(provider_max));

        assert_eq!(tracker.populate_daily_fallbacks(&mut c, "home").unwrap(), 0);
    }

    #[test]
    fn test_fallbacks_without_history_leave_gaps() {
        let (tracker, _) = tracker();
        let mut c = conditions(None, noon());
        assert_eq!(tracker.populate_daily_fallbacks(&mut c, "home").unwrap(), 0);
        assert!(c.temperature_min_today.is_none());
        assert!(c.temperature_max_today.is_none());
    }

    #[test]
    fn test_clear_today() {
        let (tracker, _) = tracker();
        tracker
            .record_field_value("home", "temperature", 4.0, Unit::Celsius, noon(), &MIN_MAX)
            .unwrap();
        assert!(tracker.clear_today("home", "temperature").unwrap());
        assert!(!tracker.clear_today("home", "temperature").unwrap());
        assert_eq!(tracker.get_temperature_min_max_today("home").unwrap(), (None, None));
    }

    #[test]
    fn test_daily_summary() {
        let (tracker, _) = tracker();
        tracker
            .record_field_value("home", "temperature", 4.0, Unit::Celsius, noon(), &MIN_MAX)
            .unwrap();
        let summary = tracker.get_daily_summary("home", tracker.today()).unwrap();
        assert_eq!(summary.fields["temperature"][&Statistic::Max].value, 4.0);

        let empty = tracker
            .get_daily_summary("home", tracker.today() - ChronoDuration::days(1))
            .unwrap();
        assert!(empty.fields.is_empty());
    }

    #[test]
    fn test_store_failure_propagates() {
        let tracker = DailyWeatherTracker::new(Arc::new(UnavailableStore), chrono_tz::UTC);
        let c = conditions(Some(Quantity::new(10.0, Unit::Celsius)), noon());

        assert!(matches!(
            tracker.record_weather_conditions(&c, "home"),
            Err(TrackerError::Store(_))
        ));
        assert!(tracker.get_temperature_min_max_today("home").is_err());
        assert!(tracker.clear_today("home", "temperature").is_err());
    }

    #[test]
    fn test_corrupt_bundle_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let tracker = DailyWeatherTracker::new(store.clone(), chrono_tz::UTC)
            .with_clock(Arc::new(FixedClock::new(noon())));
        let key = tracker.cache_key("home", tracker.today(), "temperature");
        store.set(&key, "not json", None).unwrap();

        assert!(matches!(
            tracker.get_temperature_min_max_today("home"),
            Err(TrackerError::Corrupt { .. })
        ));
    }
}
