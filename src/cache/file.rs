//! JSON file cache store
//!
//! Keeps every record in one JSON document on disk (`cache.json` in the XDG
//! cache directory by default). The document is loaded once when the store is
//! opened and rewritten after every mutation through a temporary file and a
//! rename, so a crash never leaves a half-written cache behind.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{default_cache_dir, is_fresh, CacheError, CacheStore, CachedValue};

/// File name used inside the cache directory
const CACHE_FILE_NAME: &str = "cache.json";

/// One persisted record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecord {
    key: String,
    value: Value,
    stored_at: DateTime<Utc>,
}

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    entries: Vec<CacheRecord>,
}

/// [`CacheStore`] persisted as a single JSON document
#[derive(Debug)]
pub struct JsonFileStore {
    /// Path of the JSON document
    path: PathBuf,
    /// In-memory view of the document, keyed by cache key
    entries: BTreeMap<String, CachedValue>,
    ttl: Duration,
}

impl JsonFileStore {
    /// Opens the store in the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/royale/cache.json` on Linux, or the equivalent path on
    /// other platforms. Returns `None` if the cache directory cannot be
    /// determined (e.g., no home directory).
    pub fn new(ttl: Duration) -> Option<Self> {
        let dir = default_cache_dir()?;
        Some(Self::open(dir.join(CACHE_FILE_NAME), ttl))
    }

    /// Opens the store backed by the document at `path`
    ///
    /// A missing file starts an empty cache. An unreadable or unparsable file
    /// is logged and also starts empty; it is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let entries = match load_document(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding unreadable cache file");
                BTreeMap::new()
            }
        };
        Self { path, entries, ttl }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries currently held, fresh or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the whole document to disk
    fn persist(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let document = CacheDocument {
            entries: self
                .entries
                .iter()
                .map(|(key, cached)| CacheRecord {
                    key: key.clone(),
                    value: cached.value.clone(),
                    stored_at: cached.stored_at,
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Reads the document at `path`; a missing file is an empty cache
fn load_document(path: &Path) -> Result<BTreeMap<String, CachedValue>, CacheError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(path)?;
    let document: CacheDocument = serde_json::from_str(&content)?;

    Ok(document
        .entries
        .into_iter()
        .map(|record| {
            (
                record.key,
                CachedValue {
                    value: record.value,
                    stored_at: record.stored_at,
                },
            )
        })
        .collect())
}

impl CacheStore for JsonFileStore {
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
        self.entries.insert(
            key.to_string(),
            CachedValue {
                value: value.clone(),
                stored_at: timestamp,
            },
        );
        self.persist()
    }

    fn read(&mut self, key: &str) -> Result<CachedValue, CacheError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        if is_fresh(entry.stored_at, self.ttl, Utc::now()) {
            return Ok(entry.clone());
        }

        self.delete(key)?;
        Err(CacheError::Expired(key.to_string()))
    }

    fn update(
        &mut self,
        key: &str,
        value: &Value,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.value = value.clone();
                entry.stored_at = timestamp;
                self.persist()
            }
            None => Ok(()),
        }
    }

    fn delete(&mut self, key: &str) -> Result<(), CacheError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        self.persist()
    }
}
