//! Provider polling and aggregation scheduler

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use wxfuse_aggregate::{AggregatedWeatherData, SourceSelectionPolicy};
use wxfuse_core::{Clock, TimeInterval, WeatherConditionsData, WeatherData, WeatherDataClass};
use wxfuse_daily::DailyWeatherTracker;
use wxfuse_ingest::{ReadingBuffer, WeatherProvider};

const MAX_BUFFERED_READINGS: usize = 1024;

struct PolledProvider {
    provider: Box<dyn WeatherProvider>,
    buffer: ReadingBuffer,
    next_poll: Option<DateTime<Utc>>,
}

/// Scheduler coordinates polling, aggregation and daily tracking
pub struct Scheduler {
    providers: Vec<PolledProvider>,
    tracker: DailyWeatherTracker,
    clock: Arc<dyn Clock>,
    policy: SourceSelectionPolicy,
    interval: ChronoDuration,
    location_key: String,
    running: bool,
}

impl Scheduler {
    pub fn new(
        providers: Vec<Box<dyn WeatherProvider>>,
        tracker: DailyWeatherTracker,
        clock: Arc<dyn Clock>,
        policy: SourceSelectionPolicy,
        interval: ChronoDuration,
        location_key: String,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| PolledProvider {
                provider,
                buffer: ReadingBuffer::new(interval, MAX_BUFFERED_READINGS),
                next_poll: None,
            })
            .collect();

        Self {
            providers,
            tracker,
            clock,
            policy,
            interval,
            location_key,
            running: false,
        }
    }

    /// Shortest provider polling interval, used as the loop tick
    fn tick(&self) -> Duration {
        self.providers
            .iter()
            .map(|p| p.provider.polling_interval())
            .min()
            .unwrap_or(Duration::from_secs(60))
            .max(Duration::from_secs(1))
    }

    /// Run the polling loop until stopped
    pub async fn run(&mut self) -> Result<()> {
        self.running = true;

        info!("Scheduler started");
        info!("Aggregation interval: {}s", self.interval.num_seconds());
        info!("Location: {}", self.location_key);

        let mut ticker = tokio::time::interval(self.tick());
        while self.running {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(conditions) => match serde_json::to_string(&conditions) {
                    Ok(json) => info!(conditions = %json, "Aggregated conditions"),
                    Err(e) => warn!("Cannot serialize conditions: {}", e),
                },
                Err(e) => {
                    error!("Error in aggregation cycle: {:#}", e);
                    // Continue running despite errors
                }
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Poll due providers, then aggregate the current interval
    pub async fn run_cycle(&mut self) -> Result<WeatherConditionsData> {
        let now = self.clock.now();
        self.poll_providers(now).await?;

        let target = TimeInterval::new(now - self.interval, now)
            .context("Invalid aggregation interval")?;
        let mut aggregate = AggregatedWeatherData::from_time_interval(
            target,
            WeatherDataClass::Conditions,
            now,
            self.policy,
        );
        for polled in &mut self.providers {
            polled.buffer.prune(now);
            for reading in polled.buffer.iter() {
                aggregate.add_source_data(reading.interval, &reading.conditions);
            }
        }

        let WeatherData::Conditions(mut conditions) = aggregate.finalize().data else {
            bail!("Aggregation produced a non-conditions record");
        };
        self.tracker
            .populate_daily_fallbacks(&mut conditions, &self.location_key)
            .context("Failed to read daily statistics")?;
        if let Err(e) = self.tracker.purge_expired() {
            warn!("Cannot purge expired daily statistics: {}", e);
        }
        Ok(conditions)
    }

    async fn poll_providers(&mut self, now: DateTime<Utc>) -> Result<()> {
        for polled in &mut self.providers {
            if polled.next_poll.is_some_and(|at| now < at) {
                continue;
            }
            let source_id = polled.provider.source().id.clone();
            let step = ChronoDuration::from_std(polled.provider.polling_interval())
                .unwrap_or(ChronoDuration::minutes(5));
            polled.next_poll = Some(now + step);

            let readings = match polled.provider.fetch_conditions().await {
                Ok(readings) => readings,
                Err(e) => {
                    warn!(source = %source_id, "Provider fetch failed: {}", e);
                    continue;
                }
            };
            debug!(source = %source_id, count = readings.len(), "Fetched readings");

            for reading in readings {
                self.tracker
                    .record_weather_conditions(&reading.conditions, &self.location_key)
                    .context("Failed to record daily statistics")?;
                if let Err(e) = polled.buffer.push(reading) {
                    warn!(source = %source_id, "Dropping reading: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Stop the scheduler after the current cycle
    pub fn stop(&mut self) {
        info!("Stopping scheduler...");
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wxfuse_core::{DataPoint, DataPointSource, FixedClock};
    use wxfuse_daily::{Tz, TRACKER_SOURCE_ID};
    use wxfuse_ingest::SimulatedProvider;
    use wxfuse_store::{MemoryStore, StatsStore};

    fn provider(
        id: &str,
        priority: i32,
        base_temp: f64,
        clock: Arc<FixedClock>,
    ) -> Box<dyn WeatherProvider> {
        let source = Arc::new(DataPointSource::new(id, id, id, priority));
        Box::new(
            SimulatedProvider::new(source, Duration::from_secs(300))
                .with_base_temp(base_temp)
                .with_clock(clock),
        )
    }

    #[tokio::test]
    async fn test_cycle_aggregates_and_backfills() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let tracker = DailyWeatherTracker::new(Arc::new(MemoryStore::new()), Tz::UTC)
            .with_clock(clock.clone());

        let mut scheduler = Scheduler::new(
            vec![
                provider("backup", 10, 30.0, clock.clone()),
                provider("primary", 1, 10.0, clock.clone()),
            ],
            tracker,
            clock.clone(),
            SourceSelectionPolicy::default(),
            ChronoDuration::minutes(60),
            "home".to_string(),
        );

        let conditions = scheduler.run_cycle().await.unwrap();
        let temp = conditions.temperature.as_ref().unwrap();
        assert_eq!(temp.source().id, "primary");

        // Both providers' raw readings fed the daily statistics
        let min = conditions.temperature_min_today.as_ref().unwrap();
        let max = conditions.temperature_max_today.as_ref().unwrap();
        let value = |dp: &DataPoint| dp.as_numeric().unwrap().quantity_ave.magnitude;
        assert_eq!(value(max) - value(min), 20.0);
        assert_eq!(min.source().id, TRACKER_SOURCE_ID);

        // Not due again until the polling interval passes
        clock.set(now + ChronoDuration::minutes(1));
        scheduler.run_cycle().await.unwrap();
        assert!(scheduler.providers.iter().all(|p| p.buffer.len() == 1));
    }

    #[tokio::test]
    async fn test_cycle_purges_expired_statistics() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(now));
        let store = Arc::new(MemoryStore::new());
        store
            .set("daily_weather:home:2024-03-13:temperature", "{}", Some(Duration::ZERO))
            .unwrap();
        let tracker = DailyWeatherTracker::new(store.clone(), Tz::UTC).with_clock(clock.clone());

        let mut scheduler = Scheduler::new(
            vec![provider("primary", 1, 10.0, clock.clone())],
            tracker,
            clock,
            SourceSelectionPolicy::default(),
            ChronoDuration::minutes(60),
            "home".to_string(),
        );
        scheduler.run_cycle().await.unwrap();

        // Only today's live bundle is left
        assert_eq!(store.purge_expired().unwrap(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }
}
