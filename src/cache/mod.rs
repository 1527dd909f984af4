//! Caching subsystem.
//!
//! Layered from the bottom up:
//! - [`store`]: the [`store::CacheBackend`] trait plus the in-process LRU/TTL
//!   implementation and the disabled-mode null backend.
//! - [`client`]: the injectable [`client::Cache`] handle owning serialization
//!   and the degrade-on-unavailability policy.
//! - [`keys`]: deterministic key derivation (`prefix[:user=<id>]:digest`).
//! - [`readthrough`]: per-endpoint read-through readers caching only
//!   successful payloads.
//! - [`invalidation`]: named pattern families cleared after writes.

pub mod client;
pub mod config;
pub mod invalidation;
pub mod keys;
pub(crate) mod lock;
pub mod readthrough;
pub mod store;

pub use client::Cache;
pub use config::CacheConfig;
pub use invalidation::InvalidationPolicy;
pub use keys::{CacheParams, build_key};
pub use readthrough::{CachedPayload, ReadThrough};
pub use store::{CacheBackend, CacheError, MemoryBackend, NullBackend};
