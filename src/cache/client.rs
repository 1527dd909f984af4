//! The injectable cache client handle.
//!
//! `Cache` is constructed once at startup and passed to every component that
//! caches. It owns serialization (serde_json) and the degrade-on-unavailability
//! policy: a backend failure downgrades the operation to its empty/no-op
//! result at the call site — logged, counted, never raised. Callers treat the
//! cache as optional infrastructure and fall through to direct computation.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::store::{CacheBackend, NullBackend};

const SOURCE: &str = "cache::client";

/// Shared handle to the cache backend.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// A handle with no backing store; every read misses, every write is a
    /// no-op. Used when caching is disabled by configuration.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullBackend))
    }

    /// Fetch and deserialize the value for `key`. Backend failures and
    /// deserialization mismatches both read as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(target: SOURCE, key, error = %err, "cache get degraded to miss");
                None
            }
        };

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    counter!("ladle_cache_hit_total").increment(1);
                    debug!(target: SOURCE, key, "cache hit");
                    Some(value)
                }
                Err(err) => {
                    warn!(target: SOURCE, key, error = %err, "cached payload failed to decode");
                    counter!("ladle_cache_miss_total").increment(1);
                    None
                }
            },
            None => {
                counter!("ladle_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Serialize and store `value`, returning whether the write took effect.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(target: SOURCE, key, error = %err, "cache set skipped: serialization failed");
                return false;
            }
        };

        match self.backend.set(key, raw, ttl).await {
            Ok(()) => true,
            Err(err) => {
                warn!(target: SOURCE, key, error = %err, "cache set degraded to no-op");
                false
            }
        }
    }

    /// Remove `key`, reporting whether an entry existed.
    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.delete(key).await {
            Ok(existed) => existed,
            Err(err) => {
                warn!(target: SOURCE, key, error = %err, "cache delete degraded to no-op");
                false
            }
        }
    }

    /// Remove every key matching the glob, returning the count.
    pub async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        match self.backend.delete_by_pattern(pattern).await {
            Ok(count) => count,
            Err(err) => {
                warn!(target: SOURCE, pattern, error = %err, "cache pattern delete degraded to no-op");
                0
            }
        }
    }

    /// Read-through primitive: on hit, return the cached value without
    /// invoking `compute`; on miss, invoke `compute` exactly once, store the
    /// result best-effort, and return it. `compute` errors propagate and
    /// nothing is cached for the key.
    ///
    /// Two concurrent misses on the same key may both compute; the second
    /// write wins. Accepted race: the computation is a pure function of
    /// re-computable upstream state.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::super::config::CacheConfig;
    use super::super::store::{CacheError, MemoryBackend};
    use super::*;

    /// Backend standing in for a dead network cache.
    struct UnavailableBackend;

    #[async_trait]
    impl CacheBackend for UnavailableBackend {
        async fn set(
            &self,
            _key: &str,
            _value: String,
            _ttl: Option<Duration>,
        ) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn delete_by_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }
    }

    fn memory_cache() -> Cache {
        Cache::new(Arc::new(MemoryBackend::new(&CacheConfig::default())))
    }

    #[tokio::test]
    async fn typed_roundtrip() {
        let cache = memory_cache();
        assert!(cache.set("k", &vec![1u32, 2, 3], None).await);
        assert_eq!(cache.get::<Vec<u32>>("k").await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn unavailable_backend_degrades_every_operation() {
        let cache = Cache::new(Arc::new(UnavailableBackend));
        assert!(!cache.set("k", &1u32, None).await);
        assert_eq!(cache.get::<u32>("k").await, None);
        assert!(!cache.delete("k").await);
        assert_eq!(cache.delete_by_pattern("*").await, 0);

        // get_or_set falls through to direct computation.
        let value: Result<u32, CacheError> =
            cache.get_or_set("k", None, || async { Ok(41 + 1) }).await;
        assert_eq!(value.expect("compute"), 42);
    }

    #[tokio::test]
    async fn get_or_set_computes_once_per_cold_key() {
        let cache = memory_cache();
        let invocations = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<u32, CacheError> = cache
                .get_or_set("hot", None, || async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value.expect("compute"), 7);
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_set_does_not_cache_compute_failures() {
        let cache = memory_cache();

        let failed: Result<u32, &str> = cache
            .get_or_set("k", None, || async { Err("upstream down") })
            .await;
        assert!(failed.is_err());

        // The failure left nothing behind; the next call computes again.
        let value: Result<u32, &str> = cache.get_or_set("k", None, || async { Ok(9) }).await;
        assert_eq!(value.expect("compute"), 9);
    }

    #[tokio::test]
    async fn disabled_cache_always_computes() {
        let cache = Cache::disabled();
        let invocations = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Result<u32, CacheError> = cache
                .get_or_set("k", None, || async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                })
                .await;
            assert_eq!(value.expect("compute"), 5);
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }
}
