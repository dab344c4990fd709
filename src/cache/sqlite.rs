//! SQLite-backed cache store
//!
//! One row per key in a `cache` table; the payload is stored as JSON text and
//! the timestamp as nanoseconds since the Unix epoch (UTC), so a read returns
//! exactly the `DateTime` that was written. Timestamps outside the range an
//! `i64` of nanoseconds can hold (before 1677 or after 2262) are rejected.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

use super::{is_fresh, CacheError, CacheStore, CachedValue};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at INTEGER NOT NULL
)";

/// File-backed [`CacheStore`] using a single SQLite connection
///
/// The connection is owned by the store and closed when it is dropped.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    ttl: Duration,
}

impl SqliteStore {
    /// Opens (or creates) the cache database at `path`
    ///
    /// Missing parent directories are created.
    pub fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, ttl)
    }

    /// Opens a private in-memory database
    pub fn in_memory(ttl: Duration) -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?, ttl)
    }

    fn with_connection(conn: Connection, ttl: Duration) -> Result<Self, CacheError> {
        conn.execute(CREATE_TABLE_SQL, [])?;
        Ok(Self { conn, ttl })
    }

    /// Number of rows in the cache table, fresh or not, corrupt or not
    pub fn len(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Column value for `timestamp`
fn to_nanos(key: &str, timestamp: DateTime<Utc>) -> Result<i64, CacheError> {
    timestamp
        .timestamp_nanos_opt()
        .ok_or_else(|| CacheError::Corrupt(key.to_string()))
}

impl CacheStore for SqliteStore {
    fn expiration_time(&self) -> Duration {
        self.ttl
    }

    fn set_expiration_time(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    fn create(
        &mut self,
        key: &str,
        value: &Value,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let nanos = to_nanos(key, timestamp)?;
        let value_json = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO cache (key, value, stored_at) VALUES (?1, ?2, ?3)",
            params![key, value_json, nanos],
        )?;
        Ok(())
    }

    fn read(&mut self, key: &str) -> Result<CachedValue, CacheError> {
        // Column conversions are kept per row so a bad row can be evicted
        let row = self
            .conn
            .query_row(
                "SELECT value, stored_at FROM cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0), row.get::<_, i64>(1))),
            )
            .optional()?;

        let decoded = match row.ok_or_else(|| CacheError::NotFound(key.to_string()))? {
            (Ok(value_json), Ok(nanos)) => serde_json::from_str::<Value>(&value_json)
                .ok()
                .map(|value| (value, DateTime::from_timestamp_nanos(nanos))),
            _ => None,
        };

        let Some((value, stored_at)) = decoded else {
            warn!(key, "evicting undecodable cache row");
            self.delete(key)?;
            return Err(CacheError::Corrupt(key.to_string()));
        };

        if !is_fresh(stored_at, self.ttl, Utc::now()) {
            self.delete(key)?;
            return Err(CacheError::Expired(key.to_string()));
        }

        Ok(CachedValue { value, stored_at })
    }

    fn update(
        &mut self,
        key: &str,
        value: &Value,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let nanos = to_nanos(key, timestamp)?;
        let value_json = serde_json::to_string(value)?;
        self.conn.execute(
            "UPDATE cache SET value = ?1, stored_at = ?2 WHERE key = ?3",
            params![value_json, nanos, key],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), CacheError> {
        self.conn
            .execute("DELETE FROM cache WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.conn.execute("DELETE FROM cache", [])?;
        Ok(())
    }
}
