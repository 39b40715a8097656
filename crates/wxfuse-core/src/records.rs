//! Weather record schemas assembled from data points
//!
//! Each record is a flat set of optional [`DataPoint`] fields. Fields are
//! addressed through [`WeatherField`] so aggregation and daily tracking can
//! walk a schema without knowing the concrete struct.

use crate::types::{DataPoint, DataPointKind};
use crate::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every field any weather schema can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherField {
    Temperature,
    TemperatureMinToday,
    TemperatureMaxToday,
    TemperatureMin,
    TemperatureMax,
    FeelsLike,
    RelativeHumidity,
    DewPoint,
    HeatIndex,
    WindChill,
    Windspeed,
    WindDirection,
    WindGust,
    BarometricPressure,
    SeaLevelPressure,
    Visibility,
    CloudCover,
    CloudCeiling,
    UvIndex,
    Precipitation,
    PrecipitationProbability,
    Snowfall,
    Description,
    IsPrecipitating,
    IsDaytime,
    Sunrise,
    Sunset,
}

impl WeatherField {
    pub fn as_str(self) -> &'static str {
        match self {
            WeatherField::Temperature => "temperature",
            WeatherField::TemperatureMinToday => "temperature_min_today",
            WeatherField::TemperatureMaxToday => "temperature_max_today",
            WeatherField::TemperatureMin => "temperature_min",
            WeatherField::TemperatureMax => "temperature_max",
            WeatherField::FeelsLike => "feels_like",
            WeatherField::RelativeHumidity => "relative_humidity",
            WeatherField::DewPoint => "dew_point",
            WeatherField::HeatIndex => "heat_index",
            WeatherField::WindChill => "wind_chill",
            WeatherField::Windspeed => "windspeed",
            WeatherField::WindDirection => "wind_direction",
            WeatherField::WindGust => "wind_gust",
            WeatherField::BarometricPressure => "barometric_pressure",
            WeatherField::SeaLevelPressure => "sea_level_pressure",
            WeatherField::Visibility => "visibility",
            WeatherField::CloudCover => "cloud_cover",
            WeatherField::CloudCeiling => "cloud_ceiling",
            WeatherField::UvIndex => "uv_index",
            WeatherField::Precipitation => "precipitation",
            WeatherField::PrecipitationProbability => "precipitation_probability",
            WeatherField::Snowfall => "snowfall",
            WeatherField::Description => "description",
            WeatherField::IsPrecipitating => "is_precipitating",
            WeatherField::IsDaytime => "is_daytime",
            WeatherField::Sunrise => "sunrise",
            WeatherField::Sunset => "sunset",
        }
    }

    /// Data point kind this field holds
    pub fn kind(self) -> DataPointKind {
        match self {
            WeatherField::Description => DataPointKind::String,
            WeatherField::IsPrecipitating | WeatherField::IsDaytime => DataPointKind::Boolean,
            WeatherField::Sunrise | WeatherField::Sunset => DataPointKind::Time,
            _ => DataPointKind::Numeric,
        }
    }
}

impl fmt::Display for WeatherField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which output schema is being assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherDataClass {
    Conditions,
    Forecast,
    History,
}

impl WeatherDataClass {
    pub fn fields(self) -> &'static [WeatherField] {
        match self {
            WeatherDataClass::Conditions => WeatherConditionsData::FIELDS,
            WeatherDataClass::Forecast => WeatherForecastData::FIELDS,
            WeatherDataClass::History => WeatherHistoryData::FIELDS,
        }
    }

    pub fn empty_record(self) -> WeatherData {
        match self {
            WeatherDataClass::Conditions => WeatherData::Conditions(Default::default()),
            WeatherDataClass::Forecast => WeatherData::Forecast(Default::default()),
            WeatherDataClass::History => WeatherData::History(Default::default()),
        }
    }
}

/// Field-addressable access to a weather schema
pub trait WeatherRecord {
    const DATA_CLASS: WeatherDataClass;
    const FIELDS: &'static [WeatherField];

    fn get(&self, field: WeatherField) -> Option<&DataPoint>;

    fn slot_mut(&mut self, field: WeatherField) -> Option<&mut Option<DataPoint>>;

    /// Set a field, checking schema membership and data point kind
    fn set(&mut self, field: WeatherField, value: Option<DataPoint>) -> ModelResult<()> {
        if let Some(dp) = &value {
            if dp.kind() != field.kind() {
                return Err(ModelError::KindMismatch {
                    field: field.as_str(),
                    expected: field.kind(),
                });
            }
        }
        let slot = self.slot_mut(field).ok_or(ModelError::FieldNotInSchema {
            field: field.as_str(),
            class: Self::DATA_CLASS,
        })?;
        *slot = value;
        Ok(())
    }

    fn populated_fields(&self) -> Vec<(WeatherField, &DataPoint)> {
        Self::FIELDS
            .iter()
            .filter_map(|f| self.get(*f).map(|dp| (*f, dp)))
            .collect()
    }
}

macro_rules! weather_record {
    (
        $(#[$meta:meta])*
        $name:ident => $class:ident {
            $($field:ident => $variant:ident),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<DataPoint>,
            )*
        }

        impl WeatherRecord for $name {
            const DATA_CLASS: WeatherDataClass = WeatherDataClass::$class;
            const FIELDS: &'static [WeatherField] = &[$(WeatherField::$variant),*];

            fn get(&self, field: WeatherField) -> Option<&DataPoint> {
                match field {
                    $(WeatherField::$variant => self.$field.as_ref(),)*
                    _ => None,
                }
            }

            fn slot_mut(&mut self, field: WeatherField) -> Option<&mut Option<DataPoint>> {
                match field {
                    $(WeatherField::$variant => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

weather_record! {
    /// Current observed conditions
    WeatherConditionsData => Conditions {
        temperature => Temperature,
        temperature_min_today => TemperatureMinToday,
        temperature_max_today => TemperatureMaxToday,
        feels_like => FeelsLike,
        relative_humidity => RelativeHumidity,
        dew_point => DewPoint,
        heat_index => HeatIndex,
        wind_chill => WindChill,
        windspeed => Windspeed,
        wind_direction => WindDirection,
        wind_gust => WindGust,
        barometric_pressure => BarometricPressure,
        sea_level_pressure => SeaLevelPressure,
        visibility => Visibility,
        cloud_cover => CloudCover,
        cloud_ceiling => CloudCeiling,
        uv_index => UvIndex,
        precipitation => Precipitation,
        description => Description,
        is_precipitating => IsPrecipitating,
    }
}

weather_record! {
    /// Predicted weather for a future interval
    WeatherForecastData => Forecast {
        temperature => Temperature,
        temperature_min => TemperatureMin,
        temperature_max => TemperatureMax,
        feels_like => FeelsLike,
        relative_humidity => RelativeHumidity,
        dew_point => DewPoint,
        windspeed => Windspeed,
        wind_direction => WindDirection,
        wind_gust => WindGust,
        cloud_cover => CloudCover,
        uv_index => UvIndex,
        precipitation => Precipitation,
        precipitation_probability => PrecipitationProbability,
        description => Description,
        is_daytime => IsDaytime,
        sunrise => Sunrise,
        sunset => Sunset,
    }
}

weather_record! {
    /// Observed weather over a past interval
    WeatherHistoryData => History {
        temperature => Temperature,
        temperature_min => TemperatureMin,
        temperature_max => TemperatureMax,
        relative_humidity => RelativeHumidity,
        windspeed => Windspeed,
        wind_direction => WindDirection,
        wind_gust => WindGust,
        barometric_pressure => BarometricPressure,
        cloud_cover => CloudCover,
        precipitation => Precipitation,
        snowfall => Snowfall,
        description => Description,
        sunrise => Sunrise,
        sunset => Sunset,
    }
}

/// One record of any schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data_class", rename_all = "lowercase")]
pub enum WeatherData {
    Conditions(WeatherConditionsData),
    Forecast(WeatherForecastData),
    History(WeatherHistoryData),
}

impl WeatherData {
    pub fn data_class(&self) -> WeatherDataClass {
        match self {
            WeatherData::Conditions(_) => WeatherDataClass::Conditions,
            WeatherData::Forecast(_) => WeatherDataClass::Forecast,
            WeatherData::History(_) => WeatherDataClass::History,
        }
    }

    pub fn get(&self, field: WeatherField) -> Option<&DataPoint> {
        match self {
            WeatherData::Conditions(r) => r.get(field),
            WeatherData::Forecast(r) => r.get(field),
            WeatherData::History(r) => r.get(field),
        }
    }

    pub fn set(&mut self, field: WeatherField, value: Option<DataPoint>) -> ModelResult<()> {
        match self {
            WeatherData::Conditions(r) => r.set(field, value),
            WeatherData::Forecast(r) => r.set(field, value),
            WeatherData::History(r) => r.set(field, value),
        }
    }

    pub fn populated_fields(&self) -> Vec<(WeatherField, &DataPoint)> {
        match self {
            WeatherData::Conditions(r) => r.populated_fields(),
            WeatherData::Forecast(r) => r.populated_fields(),
            WeatherData::History(r) => r.populated_fields(),
        }
    }
}

impl From<WeatherConditionsData> for WeatherData {
    fn from(value: WeatherConditionsData) -> Self {
        WeatherData::Conditions(value)
    }
}

impl From<WeatherForecastData> for WeatherData {
    fn from(value: WeatherForecastData) -> Self {
        WeatherData::Forecast(value)
    }
}

impl From<WeatherHistoryData> for WeatherData {
    fn from(value: WeatherHistoryData) -> Self {
        WeatherData::History(value)
    }
}
