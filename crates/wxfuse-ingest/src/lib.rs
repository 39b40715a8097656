//! Provider adapters feeding normalized readings into the engine
//!
//! Wire formats are owned by the adapters; everything crossing this crate's
//! boundary is already a [`WeatherConditionsData`] with attributed data
//! points and a validity interval.

pub mod buffer;
pub mod simulator;

pub use buffer::*;
pub use simulator::*;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use wxfuse_core::{DataPointSource, ModelError, TimeInterval, WeatherConditionsData};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Invalid reading: {0}")]
    InvalidReading(#[from] ModelError),

    #[error("Buffer overflow")]
    BufferOverflow,
}

pub type IngestResult<T> = Result<T, IngestError>;

/// One provider record and the interval it is valid for
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReading {
    pub interval: TimeInterval,
    pub conditions: WeatherConditionsData,
}

/// Trait for all weather data providers
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    fn source(&self) -> &Arc<DataPointSource>;

    /// How often the provider should be polled
    fn polling_interval(&self) -> Duration;

    /// Fetch the provider's latest conditions
    async fn fetch_conditions(&mut self) -> IngestResult<Vec<SourceReading>>;
}
