//! Cache-backed fetch pipeline
//!
//! Decides for each request whether to serve a cached payload or go to the
//! network, and writes fresh payloads back to the cache. Cache failures are
//! always recovered here and never reach the caller; network failures always
//! do.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::cache::{CacheError, CacheStore, CachedValue};

/// Payload returned by [`Pipeline::resolve`] together with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub value: Value,
    /// True when the payload was served from the cache
    pub is_from_cache: bool,
    /// `stored_at` of the cache entry on a hit, the fetch time otherwise
    pub observed_at: DateTime<Utc>,
}

/// Outcome of consulting the cache before a fetch
#[derive(Debug)]
pub enum CacheLookup {
    Hit(CachedValue),
    NotFound,
    Expired,
    /// The store failed for another reason; treated as no usable entry
    Unavailable(CacheError),
}

impl From<Result<CachedValue, CacheError>> for CacheLookup {
    fn from(result: Result<CachedValue, CacheError>) -> Self {
        match result {
            Ok(cached) => CacheLookup::Hit(cached),
            Err(CacheError::NotFound(_)) => CacheLookup::NotFound,
            Err(CacheError::Expired(_)) => CacheLookup::Expired,
            Err(other) => CacheLookup::Unavailable(other),
        }
    }
}

/// Shared cache store plus the cache-vs-network decision logic
///
/// Caching is enabled iff the pipeline holds a store. The store sits behind a
/// mutex that is only ever held for a single synchronous store call.
pub struct Pipeline {
    store: Option<Mutex<Box<dyn CacheStore>>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("cache_enabled", &self.cache_enabled())
            .finish()
    }
}

impl Pipeline {
    /// Creates a pipeline; `None` disables caching entirely
    pub fn new(store: Option<Box<dyn CacheStore>>) -> Self {
        Self {
            store: store.map(Mutex::new),
        }
    }

    /// Creates a pipeline that always goes to the network
    pub fn uncached() -> Self {
        Self::new(None)
    }

    pub fn cache_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Runs `op` against the store, if there is one
    ///
    /// A poisoned lock is recovered; stores keep no invariants that a panic
    /// in another caller could break halfway.
    pub fn with_store<R>(&self, op: impl FnOnce(&mut dyn CacheStore) -> R) -> Option<R> {
        let store = self.store.as_ref()?;
        let mut guard: MutexGuard<'_, Box<dyn CacheStore>> =
            store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(op(guard.as_mut()))
    }

    /// Looks `key` up in the cache without touching the network
    pub fn lookup(&self, key: &str) -> Option<CacheLookup> {
        self.with_store(|store| CacheLookup::from(store.read(key)))
    }

    /// Resolves `key` from the cache or, failing that, through `fetch`
    ///
    /// With `force_request` the cache is neither read nor written. After a
    /// fetch the payload is written back only when the lookup found no entry
    /// at all; an expired lookup does not trigger a write.
    ///
    /// # Arguments
    /// * `key` - Cache key, also handed to `fetch` (the request URL for the client)
    /// * `fetch` - Produces the live payload on a miss
    /// * `force_request` - Skip the cache entirely for this call
    ///
    /// # Returns
    /// * `Ok(FetchResult)` with `is_from_cache = true` and the entry's `stored_at` on a hit
    /// * `Ok(FetchResult)` with `is_from_cache = false` and the fetch time otherwise
    /// * `Err` with the error from `fetch`, unmodified; cache errors never surface here
    pub async fn resolve<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        force_request: bool,
    ) -> Result<FetchResult, E>
    where
        F: FnOnce(&str) -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let use_cache = self.cache_enabled() && !force_request;

        let mut lookup = None;
        if use_cache {
            match self.lookup(key) {
                Some(CacheLookup::Hit(cached)) => {
                    debug!(key, stored_at = %cached.stored_at, "cache hit");
                    return Ok(FetchResult {
                        value: cached.value,
                        is_from_cache: true,
                        observed_at: cached.stored_at,
                    });
                }
                Some(CacheLookup::Unavailable(err)) => {
                    warn!(key, error = %err, "cache read failed, falling back to network");
                    lookup = Some(CacheLookup::Unavailable(err));
                }
                other => {
                    debug!(key, outcome = ?other, "cache miss");
                    lookup = other;
                }
            }
        }

        let value = fetch(key).await?;
        let observed_at = Utc::now();

        if use_cache && matches!(lookup, Some(CacheLookup::NotFound)) {
            match self.with_store(|store| store.create(key, &value, observed_at)) {
                Some(Err(err)) => warn!(key, error = %err, "cache write failed"),
                _ => debug!(key, "cached fresh response"),
            }
        }

        Ok(FetchResult {
            value,
            is_from_cache: false,
            observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, SqliteStore};
    use chrono::Duration;
    use serde_json::json;
    use std::cell::Cell;
    use std::convert::Infallible;

    fn memory_pipeline(ttl_secs: i64) -> Pipeline {
        Pipeline::new(Some(Box::new(MemoryStore::new(Duration::seconds(ttl_secs)))))
    }

    /// Store whose reads always fail with a non-miss error
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn expiration_time(&self) -> Duration {
            Duration::seconds(60)
        }
        fn set_expiration_time(&mut self, _ttl: Duration) {}
        fn create(&mut self, _: &str, _: &Value, _: DateTime<Utc>) -> Result<(), CacheError> {
            Err(CacheError::Corrupt("create".to_string()))
        }
        fn read(&mut self, key: &str) -> Result<CachedValue, CacheError> {
            Err(CacheError::Corrupt(key.to_string()))
        }
        fn update(&mut self, _: &str, _: &Value, _: DateTime<Utc>) -> Result<(), CacheError> {
            Ok(())
        }
        fn delete(&mut self, _: &str) -> Result<(), CacheError> {
            Ok(())
        }
        fn clear(&mut self) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_short_circuits_fetch() {
        let pipeline = memory_pipeline(60);
        let stored_at = Utc::now() - Duration::seconds(10);
        pipeline
            .with_store(|s| s.create("K", &json!({"x": 1}), stored_at))
            .unwrap()
            .unwrap();

        let calls = Cell::new(0);
        let result = pipeline
            .resolve(
                "K",
                |_| {
                    calls.set(calls.get() + 1);
                    async { Ok::<_, Infallible>(json!({"x": 99})) }
                },
                false,
            )
            .await
            .unwrap();

        assert_eq!(calls.get(), 0);
        assert!(result.is_from_cache);
        assert_eq!(result.value, json!({"x": 1}));
        assert_eq!(result.observed_at, stored_at);
    }

    #[tokio::test]
    async fn test_miss_fetches_once_and_writes_through() {
        let pipeline = memory_pipeline(60);
        let calls = Cell::new(0);

        let first = pipeline
            .resolve(
                "K",
                |key| {
                    assert_eq!(key, "K");
                    calls.set(calls.get() + 1);
                    async { Ok::<_, Infallible>(json!({"x": 1})) }
                },
                false,
            )
            .await
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert!(!first.is_from_cache);

        let second = pipeline
            .resolve(
                "K",
                |_| {
                    calls.set(calls.get() + 1);
                    async { Ok::<_, Infallible>(json!({"x": 2})) }
                },
                false,
            )
            .await
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert!(second.is_from_cache);
        assert_eq!(second.value, json!({"x": 1}));
        assert_eq!(second.observed_at, first.observed_at);
    }

    #[tokio::test]
    async fn test_sqlite_hit_reports_the_observed_at_of_the_miss() {
        let store = SqliteStore::in_memory(Duration::seconds(60)).unwrap();
        let pipeline = Pipeline::new(Some(Box::new(store)));

        let miss = pipeline
            .resolve("K", |_| async { Ok::<_, Infallible>(json!(1)) }, false)
            .await
            .unwrap();
        let hit = pipeline
            .resolve("K", |_| async { Ok::<_, Infallible>(json!(2)) }, false)
            .await
            .unwrap();

        assert!(hit.is_from_cache);
        assert_eq!(hit.value, json!(1));
        assert_eq!(hit.observed_at, miss.observed_at);
    }

    #[tokio::test]
    async fn test_force_request_bypasses_read_and_write() {
        let pipeline = memory_pipeline(60);
        let stored_at = Utc::now();
        pipeline
            .with_store(|s| s.create("K", &json!("cached"), stored_at))
            .unwrap()
            .unwrap();

        let forced = pipeline
            .resolve("K", |_| async { Ok::<_, Infallible>(json!("live")) }, true)
            .await
            .unwrap();
        assert!(!forced.is_from_cache);
        assert_eq!(forced.value, json!("live"));

        let cached = pipeline.with_store(|s| s.read("K")).unwrap().unwrap();
        assert_eq!(cached.value, json!("cached"));
        assert_eq!(cached.stored_at, stored_at);
    }

    #[tokio::test]
    async fn test_force_request_on_empty_cache_does_not_write() {
        let pipeline = memory_pipeline(60);

        pipeline
            .resolve("K", |_| async { Ok::<_, Infallible>(json!(1)) }, true)
            .await
            .unwrap();

        assert!(matches!(pipeline.lookup("K"), Some(CacheLookup::NotFound)));
    }

    #[tokio::test]
    async fn test_expired_miss_fetches_without_write_back() {
        let pipeline = memory_pipeline(60);
        pipeline
            .with_store(|s| s.create("K", &json!("stale"), Utc::now() - Duration::seconds(61)))
            .unwrap()
            .unwrap();

        let result = pipeline
            .resolve("K", |_| async { Ok::<_, Infallible>(json!("live")) }, false)
            .await
            .unwrap();
        assert!(!result.is_from_cache);
        assert_eq!(result.value, json!("live"));

        // The stale entry was evicted by the read and nothing replaced it
        assert!(matches!(pipeline.lookup("K"), Some(CacheLookup::NotFound)));

        // A following true miss writes through again
        pipeline
            .resolve("K", |_| async { Ok::<_, Infallible>(json!("again")) }, false)
            .await
            .unwrap();
        assert!(matches!(pipeline.lookup("K"), Some(CacheLookup::Hit(_))));
    }

    #[tokio::test]
    async fn test_fetch_error_propagates_and_nothing_is_cached() {
        let pipeline = memory_pipeline(60);

        let result = pipeline
            .resolve("K", |_| async { Err::<Value, _>("boom") }, false)
            .await;

        assert_eq!(result.unwrap_err(), "boom");
        assert!(matches!(pipeline.lookup("K"), Some(CacheLookup::NotFound)));
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_network_only() {
        let pipeline = Pipeline::new(Some(Box::new(BrokenStore)));

        let result = pipeline
            .resolve("K", |_| async { Ok::<_, Infallible>(json!(7)) }, false)
            .await
            .unwrap();

        assert!(!result.is_from_cache);
        assert_eq!(result.value, json!(7));
        assert!(matches!(
            pipeline.lookup("K"),
            Some(CacheLookup::Unavailable(CacheError::Corrupt(_)))
        ));
    }

    #[tokio::test]
    async fn test_uncached_pipeline_always_fetches() {
        let pipeline = Pipeline::uncached();
        assert!(!pipeline.cache_enabled());
        assert!(pipeline.lookup("K").is_none());

        let calls = Cell::new(0);
        for _ in 0..2 {
            let result = pipeline
                .resolve(
                    "K",
                    |_| {
                        calls.set(calls.get() + 1);
                        async { Ok::<_, Infallible>(json!(1)) }
                    },
                    false,
                )
                .await
                .unwrap();
            assert!(!result.is_from_cache);
        }
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_scenario_ttl_sixty_seconds() {
        let pipeline = memory_pipeline(60);
        let t0 = Utc::now() - Duration::seconds(30);
        pipeline
            .with_store(|s| s.create("A", &json!({"x": 1}), t0))
            .unwrap()
            .unwrap();

        // t = 30: fresh
        let hit = pipeline.with_store(|s| s.read("A")).unwrap().unwrap();
        assert_eq!(hit.value, json!({"x": 1}));
        assert_eq!(hit.stored_at, t0);

        // t = 61: move the entry back in time instead of waiting
        pipeline
            .with_store(|s| s.update("A", &json!({"x": 1}), Utc::now() - Duration::seconds(61)))
            .unwrap()
            .unwrap();
        assert!(matches!(pipeline.lookup("A"), Some(CacheLookup::Expired)));
        assert!(matches!(pipeline.lookup("A"), Some(CacheLookup::NotFound)));

        // t = 62: fetch
        let result = pipeline
            .resolve("A", |_| async { Ok::<_, Infallible>(json!({"x": 2})) }, false)
            .await
            .unwrap();
        assert_eq!(result.value, json!({"x": 2}));
        assert!(!result.is_from_cache);
    }
}
