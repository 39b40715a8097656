//! Running daily extrema per location and field
//!
//! Observations are bucketed by the calendar date in the tracker's
//! configured timezone and stored as one serialized bundle per
//! `(location, date, field)`.

pub mod stats;
pub mod tracker;

pub use stats::*;
pub use tracker::*;

pub use chrono_tz::Tz;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Store error: {0}")]
    Store(#[from] wxfuse_store::StoreError),

    #[error("Corrupt statistics bundle under {key}: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
