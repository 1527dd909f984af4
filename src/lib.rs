//! Ladle: the caching and asynchronous-task core of a recipe-sharing backend.
//!
//! The crate is organized in three layers:
//!
//! - [`cache`]: deterministic key derivation, a TTL key/value store with
//!   pattern deletion, read-through wrapping, and per-entity invalidation
//!   policies. The cache degrades to a no-op when its backend is unavailable;
//!   it is never allowed to fail a business operation.
//! - [`application`]: recipe/favorite/shopping-cart services that exercise the
//!   cache, and the task queue + status tracker for outbound external-API work.
//! - [`infra`]: HTTP surface, external API clients, repositories, telemetry.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
