//! Cache module for storing API responses with a time-to-live
//!
//! Every store implements [`CacheStore`]: create/read/update/delete/clear over
//! `(key, value, stored_at)` records with one expiration window shared by all
//! entries. A read that finds an expired entry deletes it and reports
//! [`CacheError::Expired`], so an entry is never served past its TTL.
//!
//! Timestamps are always `chrono::Utc`, on write and on read.

mod file;
mod memory;
mod sqlite;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Default expiration window for cached responses (one minute)
pub const DEFAULT_TTL_MINUTES: i64 = 1;

/// Errors reported by cache stores
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry exists for the key
    #[error("Key '{0}' not found in cache")]
    NotFound(String),

    /// An entry existed but was stale; it has been removed
    #[error("Key '{0}' expired in cache")]
    Expired(String),

    /// The stored record could not be interpreted
    #[error("Corrupt cache entry for key '{0}'")]
    Corrupt(String),

    /// SQLite failure
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be (de)serialized
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A value read back from the cache together with the time it was stored
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub value: Value,
    pub stored_at: DateTime<Utc>,
}

/// Persistent key-value storage with a uniform expiration window
///
/// Stores own their backing handle exclusively and take `&mut self` for every
/// operation; sharing one store across threads needs external locking.
pub trait CacheStore: Send {
    /// Current expiration window
    fn expiration_time(&self) -> Duration;

    /// Changes the expiration window for all future reads
    fn set_expiration_time(&mut self, ttl: Duration);

    /// Inserts the entry, replacing any existing entry for `key`
    fn create(&mut self, key: &str, value: &Value, timestamp: DateTime<Utc>)
        -> Result<(), CacheError>;

    /// Returns the entry for `key` if it is still fresh
    ///
    /// A stale entry is deleted before the error is returned, so a second read
    /// of the same key reports `NotFound`.
    ///
    /// # Arguments
    /// * `key` - The cache key to read
    ///
    /// # Returns
    /// * `Ok(CachedValue)` with the stored value and its exact `stored_at`
    /// * `Err(CacheError::NotFound)` if no entry exists
    /// * `Err(CacheError::Expired)` if `now > stored_at + ttl`
    /// * `Err` with any other variant if the backend fails
    fn read(&mut self, key: &str) -> Result<CachedValue, CacheError>;

    /// Overwrites an existing entry; does nothing if `key` is absent
    fn update(&mut self, key: &str, value: &Value, timestamp: DateTime<Utc>)
        -> Result<(), CacheError>;

    /// Removes the entry for `key` if present
    fn delete(&mut self, key: &str) -> Result<(), CacheError>;

    /// Removes every entry
    fn clear(&mut self) -> Result<(), CacheError>;
}

/// Whether an entry stored at `stored_at` is still fresh at `now`
///
/// Fresh means `now <= stored_at + ttl`; the boundary itself is fresh.
pub fn is_fresh(stored_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match stored_at.checked_add_signed(ttl) {
        Some(expires_at) => now <= expires_at,
        // ttl too large to represent, never expires
        None => true,
    }
}

/// XDG-compliant cache directory (`~/.cache/royale/` on Linux)
///
/// Returns `None` if no home directory can be determined.
pub fn default_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "royale")?;
    Some(project_dirs.cache_dir().to_path_buf())
}
