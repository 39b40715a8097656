//! Multi-source weather aggregation
//!
//! Folds per-source data points into one canonical record per target
//! interval. Values are combined with overlap-weighted rules per data
//! point kind, and each field is owned by one provider chosen by priority
//! and freshness.

pub mod aggregator;
pub mod combine;
pub mod selection;

pub use aggregator::*;
pub use combine::*;
pub use selection::*;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use wxfuse_core::{DataPoint, DataPointSource, TimeInterval, UnitError};

/// One source's contributions to a field, keyed by validity interval
pub type IntervalDataPoints = BTreeMap<TimeInterval, DataPoint>;

/// Contributions to a field grouped by provider
pub type SourceDataMap = HashMap<Arc<DataPointSource>, IntervalDataPoints>;

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("No contributor overlaps the target interval {0}")]
    NoOverlap(TimeInterval),

    #[error("Unit mismatch: {0}")]
    Unit(#[from] UnitError),
}

pub type AggregateResult<T> = Result<T, AggregateError>;
