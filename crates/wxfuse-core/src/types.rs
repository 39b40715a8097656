//! Core data types for attributed weather observations

use crate::units::{Quantity, UnitError};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A data provider. Lower `priority` means more trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPointSource {
    pub id: String,
    pub label: String,
    pub abbreviation: String,
    pub priority: i32,
}

impl DataPointSource {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        abbreviation: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            abbreviation: abbreviation.into(),
            priority,
        }
    }
}

impl PartialEq for DataPointSource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DataPointSource {}

impl Hash for DataPointSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Physical or logical origin of observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub source: Arc<DataPointSource>,
    pub station_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_location: Option<GeoLocation>,
}

impl Station {
    pub fn new(source: Arc<DataPointSource>, station_id: impl Into<String>) -> Self {
        Self {
            source,
            station_id: station_id.into(),
            name: None,
            geo_location: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_geo_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.geo_location = Some(GeoLocation {
            latitude,
            longitude,
        });
        self
    }
}

/// Which payload a data point carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataPointKind {
    Numeric,
    Boolean,
    String,
    Time,
}

/// Numeric payload; min/max fall back to the average when absent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericValue {
    pub quantity_ave: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_min: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_max: Option<Quantity>,
}

impl NumericValue {
    pub fn new(quantity_ave: Quantity) -> Self {
        Self {
            quantity_ave,
            quantity_min: None,
            quantity_max: None,
        }
    }

    pub fn with_range(quantity_ave: Quantity, min: Quantity, max: Quantity) -> Self {
        Self {
            quantity_ave,
            quantity_min: Some(min),
            quantity_max: Some(max),
        }
    }

    pub fn min(&self) -> Quantity {
        self.quantity_min.unwrap_or(self.quantity_ave)
    }

    pub fn max(&self) -> Quantity {
        self.quantity_max.unwrap_or(self.quantity_ave)
    }

    /// Express all three quantities in `unit`
    pub fn to(&self, unit: crate::Unit) -> Result<NumericValue, UnitError> {
        Ok(NumericValue {
            quantity_ave: self.quantity_ave.to(unit)?,
            quantity_min: self.quantity_min.map(|q| q.to(unit)).transpose()?,
            quantity_max: self.quantity_max.map(|q| q.to(unit)).transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DataPointValue {
    Numeric(NumericValue),
    Boolean(bool),
    String(String),
    Time(NaiveTime),
}

impl DataPointValue {
    pub fn kind(&self) -> DataPointKind {
        match self {
            DataPointValue::Numeric(_) => DataPointKind::Numeric,
            DataPointValue::Boolean(_) => DataPointKind::Boolean,
            DataPointValue::String(_) => DataPointKind::String,
            DataPointValue::Time(_) => DataPointKind::Time,
        }
    }
}

/// One provider's observation of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub station: Arc<Station>,
    pub source_datetime: DateTime<Utc>,
    pub value: DataPointValue,
}

impl DataPoint {
    pub fn new(station: Arc<Station>, source_datetime: DateTime<Utc>, value: DataPointValue) -> Self {
        Self {
            station,
            source_datetime,
            value,
        }
    }

    pub fn numeric(station: Arc<Station>, source_datetime: DateTime<Utc>, quantity: Quantity) -> Self {
        Self::new(
            station,
            source_datetime,
            DataPointValue::Numeric(NumericValue::new(quantity)),
        )
    }

    pub fn boolean(station: Arc<Station>, source_datetime: DateTime<Utc>, value: bool) -> Self {
        Self::new(station, source_datetime, DataPointValue::Boolean(value))
    }

    pub fn string(
        station: Arc<Station>,
        source_datetime: DateTime<Utc>,
        value: impl Into<String>,
    ) -> Self {
        Self::new(station, source_datetime, DataPointValue::String(value.into()))
    }

    pub fn time(station: Arc<Station>, source_datetime: DateTime<Utc>, value: NaiveTime) -> Self {
        Self::new(station, source_datetime, DataPointValue::Time(value))
    }

    pub fn source(&self) -> &Arc<DataPointSource> {
        &self.station.source
    }

    pub fn kind(&self) -> DataPointKind {
        self.value.kind()
    }

    pub fn as_numeric(&self) -> Option<&NumericValue> {
        match &self.value {
            DataPointValue::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            DataPointValue::Boolean(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            DataPointValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self.value {
            DataPointValue::Time(v) => Some(v),
            _ => None,
        }
    }
}
