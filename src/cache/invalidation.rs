//! Pattern invalidation policies.
//!
//! Each mutating operation maps to an [`InvalidationPolicy`]: a named family
//! of glob patterns cleared after the write commits. Patterns containing the
//! `{user}` placeholder expand against the caller identity and are skipped
//! when no identity is available, so user-scoped invalidation never widens to
//! other users' entries.

use metrics::counter;
use tracing::debug;

use super::client::Cache;

/// Glob patterns cleared after a family of writes.
#[derive(Debug, Clone, Copy)]
pub struct InvalidationPolicy {
    pub family: &'static str,
    pub patterns: &'static [&'static str],
}

/// Recipe create/update/delete: every list and detail view may be stale.
pub const RECIPES: InvalidationPolicy = InvalidationPolicy {
    family: "recipes",
    patterns: &["recipes:list:*", "recipes:detail:*"],
};

/// Ingredient catalog changes.
pub const INGREDIENTS: InvalidationPolicy = InvalidationPolicy {
    family: "ingredients",
    patterns: &["ingredients:list:*", "ingredients:detail:*"],
};

/// Favorite toggles only change the acting user's view of recipes.
pub const FAVORITES: InvalidationPolicy = InvalidationPolicy {
    family: "favorites",
    patterns: &["recipes:list:user={user}:*", "recipes:detail:user={user}:*"],
};

/// Shopping cart changes, likewise scoped to the acting user.
pub const SHOPPING_CART: InvalidationPolicy = InvalidationPolicy {
    family: "shopping_cart",
    patterns: &["recipes:list:user={user}:*", "recipes:detail:user={user}:*"],
};

impl InvalidationPolicy {
    /// Concrete patterns for this caller. User-scoped patterns without an
    /// identity to bind are dropped rather than widened.
    pub fn expand(&self, identity: Option<&str>) -> Vec<String> {
        self.patterns
            .iter()
            .filter_map(|pattern| {
                if pattern.contains("{user}") {
                    identity.map(|id| pattern.replace("{user}", id))
                } else {
                    Some((*pattern).to_string())
                }
            })
            .collect()
    }

    /// Clear every expanded pattern. Best-effort: the cache handle already
    /// degrades backend failures, so invalidation never fails the write that
    /// triggered it.
    pub async fn invalidate(&self, cache: &Cache, identity: Option<&str>) {
        let mut removed = 0u64;
        for pattern in self.expand(identity) {
            removed += cache.delete_by_pattern(&pattern).await;
        }
        counter!("ladle_cache_invalidate_total", "family" => self.family).increment(removed);
        debug!(
            target: "cache::invalidation",
            family = self.family,
            removed,
            "invalidated cache patterns"
        );
    }
}
