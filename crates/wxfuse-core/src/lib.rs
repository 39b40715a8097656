//! Core data types, units, and weather records for wxfuse
//!
//! This crate provides the value types shared by the aggregation engine
//! and the daily tracker: time intervals, attributed data points, unit
//! quantities and the weather record schemas they populate.

pub mod clock;
pub mod interval;
pub mod records;
pub mod types;
pub mod units;

pub use clock::*;
pub use interval::*;
pub use records::*;
pub use types::*;
pub use units::*;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Invalid interval: start {start} is after end {end}")]
    InvalidInterval { start: String, end: String },

    #[error("Field {field} expects a {expected:?} data point")]
    KindMismatch {
        field: &'static str,
        expected: DataPointKind,
    },

    #[error("Field {field} is not part of the {class:?} schema")]
    FieldNotInSchema {
        field: &'static str,
        class: WeatherDataClass,
    },

    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),
}

pub type ModelResult<T> = Result<T, ModelError>;
