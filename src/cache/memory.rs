//! In-process cache store
//!
//! Nothing survives the process; useful for tests and short-lived tools.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;

use super::{is_fresh, CacheError, CacheStore, CachedValue};

/// `HashMap`-backed [`CacheStore`]
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, CachedValue>,
    ttl: Duration,
}

impl MemoryStore {
    /// Creates an empty store with the given expiration window
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Number of entries currently held, fresh or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryStore {
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
        Ok(())
    }

    fn read(&mut self, key: &str) -> Result<CachedValue, CacheError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        if is_fresh(entry.stored_at, self.ttl, Utc::now()) {
            return Ok(entry.clone());
        }

        self.entries.remove(key);
        Err(CacheError::Expired(key.to_string()))
    }

    fn update(
        &mut self,
        key: &str,
        value: &Value,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.value = value.clone();
            entry.stored_at = timestamp;
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}
