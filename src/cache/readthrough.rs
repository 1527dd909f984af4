//! Read-through caching of endpoint responses.
//!
//! A [`ReadThrough`] pairs a key prefix with a TTL and a [`Cache`] handle.
//! Callers hand it the canonical request parameters and a fetch closure that
//! produces the authoritative [`CachedPayload`]; the reader serves a hit or
//! computes, caching only successful (2xx) payloads so that transient upstream
//! failures never get pinned for a TTL.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::client::Cache;
use super::keys::{CacheParams, build_key};

/// Response snapshot as cached: status code plus the JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPayload {
    pub status: u16,
    pub body: serde_json::Value,
}

impl CachedPayload {
    pub fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Read-through reader for one endpoint family.
#[derive(Clone)]
pub struct ReadThrough {
    prefix: String,
    ttl: Duration,
    cache: Cache,
}

impl ReadThrough {
    pub fn new(prefix: impl Into<String>, ttl: Duration, cache: Cache) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
            cache,
        }
    }

    /// Serve the response for `params`, fetching on miss.
    ///
    /// Only success payloads are written back; error payloads pass through
    /// uncached. Fetch errors propagate unchanged.
    pub async fn respond<F, Fut, E>(
        &self,
        identity: Option<&str>,
        params: &CacheParams,
        fetch: F,
    ) -> Result<CachedPayload, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedPayload, E>>,
    {
        let key = build_key(&self.prefix, identity, params);

        if let Some(cached) = self.cache.get::<CachedPayload>(&key).await {
            return Ok(cached);
        }

        let payload = fetch().await?;
        if payload.is_success() {
            self.cache.set(&key, &payload, Some(self.ttl)).await;
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::super::config::CacheConfig;
    use super::super::store::MemoryBackend;
    use super::*;

    fn reader() -> ReadThrough {
        let cache = Cache::new(Arc::new(MemoryBackend::new(&CacheConfig::default())));
        ReadThrough::new("recipes:list", Duration::from_secs(60), cache)
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let reader = reader();
        let params = CacheParams::new();
        let fetches = AtomicUsize::new(0);

        for _ in 0..3 {
            let payload: Result<_, &str> = reader
                .respond(None, &params, || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(CachedPayload::ok(json!({"count": 0, "results": []})))
                })
                .await;
            assert_eq!(payload.expect("fetch").status, 200);
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_payloads_are_not_cached() {
        let reader = reader();
        let params = CacheParams::new();
        let fetches = AtomicUsize::new(0);

        for _ in 0..2 {
            let payload: Result<_, &str> = reader
                .respond(None, &params, || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(CachedPayload {
                        status: 404,
                        body: json!({"detail": "not found"}),
                    })
                })
                .await;
            assert_eq!(payload.expect("fetch").status, 404);
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn identities_read_separate_entries() {
        let reader = reader();
        let params = CacheParams::new();

        let for_alice: Result<_, &str> = reader
            .respond(Some("alice"), &params, || async {
                Ok(CachedPayload::ok(json!({"favorited": true})))
            })
            .await;
        assert_eq!(for_alice.expect("fetch").body["favorited"], json!(true));

        // A different identity misses and fetches its own view.
        let for_bob: Result<_, &str> = reader
            .respond(Some("bob"), &params, || async {
                Ok(CachedPayload::ok(json!({"favorited": false})))
            })
            .await;
        assert_eq!(for_bob.expect("fetch").body["favorited"], json!(false));
    }

    #[tokio::test]
    async fn fetch_errors_propagate_and_nothing_is_cached() {
        let reader = reader();
        let params = CacheParams::new();

        let failed: Result<CachedPayload, &str> = reader
            .respond(None, &params, || async { Err("repo down") })
            .await;
        assert!(failed.is_err());

        let recovered: Result<_, &str> = reader
            .respond(None, &params, || async {
                Ok(CachedPayload::ok(json!({"count": 1})))
            })
            .await;
        assert_eq!(recovered.expect("fetch").body["count"], json!(1));
    }
}
