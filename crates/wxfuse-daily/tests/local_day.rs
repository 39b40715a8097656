//! Day-boundary behaviour in a timezone behind UTC

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;
use std::sync::Arc;
use wxfuse_core::{
    DataPoint, DataPointSource, FixedClock, Quantity, Station, Unit, WeatherConditionsData,
};
use wxfuse_daily::{DailyWeatherTracker, Statistic};
use wxfuse_store::{MemoryStore, SqliteStore};

fn reading(celsius: f64, at: chrono::DateTime<Utc>) -> WeatherConditionsData {
    let source = Arc::new(DataPointSource::new("nws", "NWS", "NWS", 1));
    let station = Arc::new(Station::new(source, "KSEA"));
    WeatherConditionsData {
        temperature: Some(DataPoint::numeric(
            station,
            at,
            Quantity::new(celsius, Unit::Celsius),
        )),
        ..Default::default()
    }
}

#[test]
fn late_evening_reading_stays_on_local_date() {
    // 23:30 PDT on March 15 is 06:30 UTC on March 16
    let late_evening = Los_Angeles
        .with_ymd_and_hms(2024, 3, 15, 23, 30, 0)
        .unwrap()
        .with_timezone(&Utc);
    assert_eq!(late_evening.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());

    let clock = Arc::new(FixedClock::new(late_evening));
    let tracker = DailyWeatherTracker::new(Arc::new(MemoryStore::new()), Los_Angeles)
        .with_clock(clock.clone());
    tracker
        .record_weather_conditions(&reading(11.5, late_evening), "seattle")
        .unwrap();

    let local = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let utc_day = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
    let summary = tracker.get_daily_summary("seattle", local).unwrap();
    assert_eq!(summary.fields["temperature"][&Statistic::Min].value, 11.5);
    assert!(tracker
        .get_daily_summary("seattle", utc_day)
        .unwrap()
        .fields
        .is_empty());

    let (min, max) = tracker.get_temperature_min_max_today("seattle").unwrap();
    assert!(min.is_some() && max.is_some());

    // 01:00 local on the 16th: a new local day with nothing recorded
    clock.set(
        Los_Angeles
            .with_ymd_and_hms(2024, 3, 16, 1, 0, 0)
            .unwrap()
            .with_timezone(&Utc),
    );
    assert_eq!(tracker.get_temperature_min_max_today("seattle").unwrap(), (None, None));
}

#[test]
fn durable_store_keeps_extrema_across_tracker_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daily.db");
    let morning = Los_Angeles
        .with_ymd_and_hms(2024, 7, 4, 6, 0, 0)
        .unwrap()
        .with_timezone(&Utc);
    let clock = Arc::new(FixedClock::new(morning));

    {
        let tracker = DailyWeatherTracker::new(Arc::new(SqliteStore::open(&path).unwrap()), Los_Angeles)
            .with_clock(clock.clone())
            .with_ttl(None);
        for (i, t) in [20.0, 25.0, 18.0, 30.0, 22.0].iter().enumerate() {
            let at = morning + chrono::Duration::minutes(i as i64 * 15);
            tracker
                .record_weather_conditions(&reading(*t, at), "seattle")
                .unwrap();
        }
    }

    let tracker = DailyWeatherTracker::new(Arc::new(SqliteStore::open(&path).unwrap()), Los_Angeles)
        .with_clock(clock);
    let (min, max) = tracker.get_temperature_min_max_today("seattle").unwrap();
    let value = |dp: Option<DataPoint>| dp.unwrap().as_numeric().unwrap().quantity_ave.magnitude;
    assert_eq!(value(min), 18.0);
    assert_eq!(value(max), 30.0);

    let mut conditions = reading(21.0, morning);
    assert_eq!(tracker.populate_daily_fallbacks(&mut conditions, "seattle").unwrap(), 2);
    assert_eq!(value(conditions.temperature_max_today), 30.0);
}
