//! Units and quantity conversion
//!
//! Every numeric observation carries its unit. Aggregation and daily
//! tracking normalize within a unit group before comparing magnitudes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit conversion error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Cannot convert {from} to {to}")]
    ConversionNotSupported { from: Unit, to: Unit },
}

/// Unit group for observation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitGroup {
    Temperature,
    Pressure,
    Length,
    Speed,
    Direction,
    Percent,
    Index,
    Count,
}

/// Physical unit attached to a quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "°F")]
    Fahrenheit,
    #[serde(rename = "K")]
    Kelvin,
    #[serde(rename = "hPa")]
    Hectopascal,
    #[serde(rename = "inHg")]
    InchesOfMercury,
    #[serde(rename = "mmHg")]
    MillimetersOfMercury,
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "cm")]
    Centimeter,
    #[serde(rename = "in")]
    Inch,
    #[serde(rename = "m")]
    Meter,
    #[serde(rename = "km")]
    Kilometer,
    #[serde(rename = "mi")]
    Mile,
    #[serde(rename = "m/s")]
    MetersPerSecond,
    #[serde(rename = "km/h")]
    KilometersPerHour,
    #[serde(rename = "mph")]
    MilesPerHour,
    #[serde(rename = "kn")]
    Knot,
    #[serde(rename = "°")]
    Degree,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "uv")]
    UvIndex,
    #[serde(rename = "count")]
    Count,
}

impl Unit {
    pub fn group(self) -> UnitGroup {
        match self {
            Unit::Celsius | Unit::Fahrenheit | Unit::Kelvin => UnitGroup::Temperature,
            Unit::Hectopascal | Unit::InchesOfMercury | Unit::MillimetersOfMercury => {
                UnitGroup::Pressure
            }
            Unit::Millimeter
            | Unit::Centimeter
            | Unit::Inch
            | Unit::Meter
            | Unit::Kilometer
            | Unit::Mile => UnitGroup::Length,
            Unit::MetersPerSecond
            | Unit::KilometersPerHour
            | Unit::MilesPerHour
            | Unit::Knot => UnitGroup::Speed,
            Unit::Degree => UnitGroup::Direction,
            Unit::Percent => UnitGroup::Percent,
            Unit::UvIndex => UnitGroup::Index,
            Unit::Count => UnitGroup::Count,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kelvin => "K",
            Unit::Hectopascal => "hPa",
            Unit::InchesOfMercury => "inHg",
            Unit::MillimetersOfMercury => "mmHg",
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Inch => "in",
            Unit::Meter => "m",
            Unit::Kilometer => "km",
            Unit::Mile => "mi",
            Unit::MetersPerSecond => "m/s",
            Unit::KilometersPerHour => "km/h",
            Unit::MilesPerHour => "mph",
            Unit::Knot => "kn",
            Unit::Degree => "°",
            Unit::Percent => "%",
            Unit::UvIndex => "uv",
            Unit::Count => "count",
        }
    }

    pub fn from_symbol(symbol: &str) -> Result<Self, UnitError> {
        ALL_UNITS
            .iter()
            .copied()
            .find(|u| u.symbol() == symbol)
            .ok_or_else(|| UnitError::UnknownUnit(symbol.to_string()))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

const ALL_UNITS: [Unit; 20] = [
    Unit::Celsius,
    Unit::Fahrenheit,
    Unit::Kelvin,
    Unit::Hectopascal,
    Unit::InchesOfMercury,
    Unit::MillimetersOfMercury,
    Unit::Millimeter,
    Unit::Centimeter,
    Unit::Inch,
    Unit::Meter,
    Unit::Kilometer,
    Unit::Mile,
    Unit::MetersPerSecond,
    Unit::KilometersPerHour,
    Unit::MilesPerHour,
    Unit::Knot,
    Unit::Degree,
    Unit::Percent,
    Unit::UvIndex,
    Unit::Count,
];

/// Unit every value in a group is normalized to
pub fn canonical_unit(group: UnitGroup) -> Unit {
    match group {
        UnitGroup::Temperature => Unit::Celsius,
        UnitGroup::Pressure => Unit::Hectopascal,
        UnitGroup::Length => Unit::Millimeter,
        UnitGroup::Speed => Unit::MetersPerSecond,
        UnitGroup::Direction => Unit::Degree,
        UnitGroup::Percent => Unit::Percent,
        UnitGroup::Index => Unit::UvIndex,
        UnitGroup::Count => Unit::Count,
    }
}

/// Convert a magnitude between units of the same group
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, UnitError> {
    if from == to {
        return Ok(value);
    }
    if from.group() != to.group() {
        return Err(UnitError::ConversionNotSupported { from, to });
    }

    // Linear groups go through the canonical unit; temperature has offsets.
    let canonical = canonical_unit(from.group());
    let base = match from {
        Unit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        Unit::Kelvin => value - 273.15,
        other => value * scale_to_canonical(other),
    };
    debug_assert_eq!(canonical_unit(to.group()), canonical);

    Ok(match to {
        Unit::Fahrenheit => base * 9.0 / 5.0 + 32.0,
        Unit::Kelvin => base + 273.15,
        other => base / scale_to_canonical(other),
    })
}

fn scale_to_canonical(unit: Unit) -> f64 {
    match unit {
        Unit::InchesOfMercury => 33.8639,
        Unit::MillimetersOfMercury => 1.333_22,
        Unit::Centimeter => 10.0,
        Unit::Inch => 25.4,
        Unit::Meter => 1000.0,
        Unit::Kilometer => 1_000_000.0,
        Unit::Mile => 1_609_344.0,
        Unit::KilometersPerHour => 1.0 / 3.6,
        Unit::MilesPerHour => 0.44704,
        Unit::Knot => 0.514_444,
        _ => 1.0,
    }
}

/// A magnitude with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self { magnitude, unit }
    }

    pub fn to(&self, unit: Unit) -> Result<Quantity, UnitError> {
        Ok(Quantity::new(convert(self.magnitude, self.unit, unit)?, unit))
    }

    pub fn to_canonical(&self) -> Result<Quantity, UnitError> {
        self.to(canonical_unit(self.unit.group()))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}
