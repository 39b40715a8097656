//! Key/value stores backing the daily statistics
//!
//! Values are opaque serialized blobs. The in-memory store behaves like a
//! cache and may drop entries once their TTL passes; the SQLite store keeps
//! the same key scheme durably.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::*;
#[cfg(feature = "sqlite")]
pub use sqlite::*;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared key/value store for serialized statistic bundles
pub trait StatsStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value`, expiring after `ttl` when given
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Remove a key; true when something was deleted
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Physically drop expired entries, returning how many were removed
    fn purge_expired(&self) -> StoreResult<usize>;
}
