//! Cache tunables and shared TTL constants.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_ENTRY_LIMIT: usize = 2048;

/// Common TTLs for cached reads.
pub mod ttl {
    use std::time::Duration;

    pub const MINUTE: Duration = Duration::from_secs(60);
    pub const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);
    pub const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);
    pub const THIRTY_MINUTES: Duration = Duration::from_secs(30 * 60);
    pub const HOUR: Duration = Duration::from_secs(60 * 60);
    pub const SIX_HOURS: Duration = Duration::from_secs(6 * 60 * 60);
    pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);
    pub const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
}

/// Cache configuration resolved from settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled at all. When false every read goes straight
    /// to the underlying fetch and writes skip invalidation.
    pub enabled: bool,
    /// Maximum number of entries held by the in-process backend.
    pub entry_limit: usize,
    /// TTL for list endpoints.
    pub list_ttl: Duration,
    /// TTL for detail endpoints.
    pub detail_ttl: Duration,
    /// TTL for the ingredient catalog (rarely changes).
    pub ingredient_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entry_limit: DEFAULT_ENTRY_LIMIT,
            list_ttl: ttl::FIVE_MINUTES,
            detail_ttl: ttl::TEN_MINUTES,
            ingredient_ttl: ttl::DAY,
        }
    }
}

impl CacheConfig {
    /// Entry limit as `NonZeroUsize`, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            entry_limit: settings.entry_limit,
            list_ttl: settings.list_ttl,
            detail_ttl: settings.detail_ttl,
            ingredient_ttl: settings.ingredient_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.entry_limit, 2048);
        assert_eq!(config.list_ttl, ttl::FIVE_MINUTES);
        assert_eq!(config.detail_ttl, ttl::TEN_MINUTES);
        assert_eq!(config.ingredient_ttl, ttl::DAY);
    }

    #[test]
    fn entry_limit_clamps_to_min() {
        let config = CacheConfig {
            entry_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.entry_limit_non_zero().get(), 1);
    }
}
