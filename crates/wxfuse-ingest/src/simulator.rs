//! Simulated provider for demos and testing

use crate::{IngestResult, SourceReading, WeatherProvider};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use wxfuse_core::{
    Clock, DataPoint, DataPointSource, Quantity, Station, SystemClock, TimeInterval, Unit,
    WeatherConditionsData,
};

/// Provider that generates synthetic conditions around a base temperature
pub struct SimulatedProvider {
    source: Arc<DataPointSource>,
    station: Arc<Station>,
    polling_interval: Duration,
    base_temp: f64,
    clock: Arc<dyn Clock>,
}

impl SimulatedProvider {
    pub fn new(source: Arc<DataPointSource>, polling_interval: Duration) -> Self {
        let station = Arc::new(
            Station::new(source.clone(), format!("{}-sim", source.id))
                .with_name(format!("{} (simulated)", source.label)),
        );
        Self {
            source,
            station,
            polling_interval,
            base_temp: 20.0, // 20°C base temperature
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_base_temp(mut self, base_temp: f64) -> Self {
        self.base_temp = base_temp;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn generate_reading(&self) -> IngestResult<SourceReading> {
        let now = self.clock.now();
        let window = ChronoDuration::from_std(self.polling_interval)
            .unwrap_or_else(|_| ChronoDuration::minutes(5));
        let interval = TimeInterval::new(now - window, now)?;

        // Add some pseudo-random variation
        let variation = ((now.timestamp() % 100) as f64 / 10.0) - 5.0;
        let temp = self.base_temp + variation;
        let raining = variation > 3.0;

        let numeric = |value: f64, unit: Unit| {
            Some(DataPoint::numeric(
                self.station.clone(),
                now,
                Quantity::new(value, unit),
            ))
        };

        let conditions = WeatherConditionsData {
            temperature: numeric(temp, Unit::Celsius),
            relative_humidity: numeric(65.0 + variation, Unit::Percent),
            barometric_pressure: numeric(1013.25 + variation * 2.0, Unit::Hectopascal),
            windspeed: numeric(5.0 + variation.abs(), Unit::MetersPerSecond),
            wind_direction: numeric((now.timestamp() % 360) as f64, Unit::Degree),
            is_precipitating: Some(DataPoint::boolean(self.station.clone(), now, raining)),
            description: Some(DataPoint::string(
                self.station.clone(),
                now,
                if raining { "Light Rain" } else { "Partly Cloudy" },
            )),
            ..Default::default()
        };

        Ok(SourceReading {
            interval,
            conditions,
        })
    }
}

#[async_trait::async_trait]
impl WeatherProvider for SimulatedProvider {
    fn source(&self) -> &Arc<DataPointSource> {
        &self.source
    }

    fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    async fn fetch_conditions(&mut self) -> IngestResult<Vec<SourceReading>> {
        let reading = self.generate_reading()?;
        tracing::debug!(source = %self.source.id, interval = %reading.interval, "Simulated reading");
        Ok(vec![reading])
    }
}
