//! Durable store on SQLite using the same key scheme as the cache

use crate::{StatsStore, StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS daily_stats (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".into()))
    }

}

impl StatsStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Utc::now().timestamp();
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM daily_stats
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let expires_at = ttl.map(|ttl| {
            let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            Utc::now().timestamp().saturating_add(secs)
        });
        self.lock()?.execute(
            "INSERT INTO daily_stats (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![key, value, expires_at],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let removed = self
            .lock()?
            .execute("DELETE FROM daily_stats WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now().timestamp();
        Ok(self.lock()?.execute(
            "DELETE FROM daily_stats WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("stats.db");

        let store = SqliteStore::open(&db_path).unwrap();
        store.set("k", "{\"min\":1}", None).unwrap();
        store.set("k", "{\"min\":0}", None).unwrap();
        drop(store);

        let store = SqliteStore::open(&db_path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("{\"min\":0}"));
        assert!(store.delete("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn expired_rows_read_as_absent() {
        let store = SqliteStore::in_memory().unwrap();
        store.set("old", "x", Some(Duration::ZERO)).unwrap();
        store.set("new", "y", Some(Duration::from_secs(3600))).unwrap();

        assert_eq!(store.get("old").unwrap(), None);
        assert_eq!(store.get("new").unwrap().as_deref(), Some("y"));
        assert_eq!(store.purge_expired().unwrap(), 1);
    }
}
