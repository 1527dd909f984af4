//! Cache storage backends.
//!
//! [`CacheBackend`] is the seam between the injectable [`super::client::Cache`]
//! handle and whatever holds the bytes. [`MemoryBackend`] is the in-process
//! implementation: LRU-bounded, per-entry TTL, glob pattern deletion. A
//! networked backend would return [`CacheError::Unavailable`] on connection
//! failure; the client handle turns that into the degraded (absent/no-op)
//! result, never a crash.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use thiserror::Error;

use super::config::CacheConfig;
use super::keys::glob_match;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {message}")]
    Unavailable { message: String },
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Key/value store with TTL and glob pattern deletion.
///
/// Values arrive pre-serialized; the client handle owns the encoding.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store `value` under `key`, overwriting any existing entry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Fetch the value for `key`. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Remove `key`, reporting whether an entry existed.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Remove every key matching the glob, returning the count. Safe to call
    /// with zero matches.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-process cache backend.
pub struct MemoryBackend {
    entries: RwLock<LruCache<String, CacheEntry>>,
}

impl MemoryBackend {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
        }
    }

    /// Number of live (possibly expired-but-unswept) entries.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.pop(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(rw_write(&self.entries, SOURCE, "delete").pop(key).is_some())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_by_pattern");
        let matches: Vec<String> = entries
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matches {
            entries.pop(key);
        }
        Ok(matches.len() as u64)
    }
}

/// Backend used when caching is disabled: every read is absent, every write a
/// no-op. Keeps call sites on the single code path regardless of deployment.
pub struct NullBackend;

#[async_trait]
impl CacheBackend for NullBackend {
    async fn set(
        &self,
        _key: &str,
        _value: String,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MemoryBackend {
        MemoryBackend::new(&CacheConfig::default())
    }

    #[tokio::test]
    async fn set_get_roundtrip() {
        let store = backend();
        store
            .set("recipes:detail:abc", "\"soup\"".to_string(), None)
            .await
            .expect("set");
        let value = store.get("recipes:detail:abc").await.expect("get");
        assert_eq!(value.as_deref(), Some("\"soup\""));
    }

    #[tokio::test]
    async fn get_missing_is_absent_not_error() {
        let store = backend();
        assert!(store.get("nope").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn overwrite_replaces_value() {
        let store = backend();
        store.set("k", "1".to_string(), None).await.expect("set");
        store.set("k", "2".to_string(), None).await.expect("set");
        assert_eq!(store.get("k").await.expect("get").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let store = backend();
        store
            .set("k", "1".to_string(), Some(Duration::from_millis(20)))
            .await
            .expect("set");
        assert!(store.get("k").await.expect("get").is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get("k").await.expect("get").is_none());
        // Expired entry is swept on read.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = backend();
        store.set("k", "1".to_string(), None).await.expect("set");
        assert!(store.delete("k").await.expect("delete"));
        assert!(!store.delete("k").await.expect("delete"));
    }

    #[tokio::test]
    async fn delete_by_pattern_removes_only_matches() {
        let store = backend();
        store
            .set("recipes:list:aaa", "1".to_string(), None)
            .await
            .expect("set");
        store
            .set("recipes:list:bbb", "2".to_string(), None)
            .await
            .expect("set");
        store
            .set("recipes:detail:ccc", "3".to_string(), None)
            .await
            .expect("set");

        let removed = store
            .delete_by_pattern("recipes:list:*")
            .await
            .expect("delete_by_pattern");
        assert_eq!(removed, 2);
        assert!(store.get("recipes:list:aaa").await.expect("get").is_none());
        assert!(store.get("recipes:list:bbb").await.expect("get").is_none());
        assert!(store.get("recipes:detail:ccc").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn delete_by_pattern_with_zero_matches_returns_zero() {
        let store = backend();
        assert_eq!(
            store.delete_by_pattern("none:*").await.expect("delete"),
            0
        );
    }

    #[tokio::test]
    async fn lru_bound_evicts_oldest() {
        let config = CacheConfig {
            entry_limit: 2,
            ..Default::default()
        };
        let store = MemoryBackend::new(&config);
        store.set("a", "1".to_string(), None).await.expect("set");
        store.set("b", "2".to_string(), None).await.expect("set");
        store.set("c", "3".to_string(), None).await.expect("set");

        assert!(store.get("a").await.expect("get").is_none());
        assert!(store.get("b").await.expect("get").is_some());
        assert!(store.get("c").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn null_backend_is_always_absent() {
        let store = NullBackend;
        store.set("k", "1".to_string(), None).await.expect("set");
        assert!(store.get("k").await.expect("get").is_none());
        assert!(!store.delete("k").await.expect("delete"));
        assert_eq!(store.delete_by_pattern("*").await.expect("delete"), 0);
    }
}
