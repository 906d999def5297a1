use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tennis_core::{PlayerId, Tour};

/// Outcome of a single resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlayer {
    pub id: PlayerId,

    /// True when this call created the player row
    pub created: bool,
}

/// Counters kept for the lifetime of a resolver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverStats {
    pub cache_hits: u64,
    pub store_hits: u64,
    pub created: u64,
}

/// Per-run identity caches, one name map per tour plus the provider id map
#[derive(Debug, Default)]
pub struct IdentityCache {
    by_name: HashMap<(Tour, String), PlayerId>,
    by_provider: HashMap<i64, PlayerId>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_name(&self, tour: Tour, normalized_name: &str) -> Option<PlayerId> {
        self.by_name.get(&(tour, normalized_name.to_string())).copied()
    }

    pub fn get_provider(&self, provider_id: i64) -> Option<PlayerId> {
        self.by_provider.get(&provider_id).copied()
    }

    pub fn insert_name(&mut self, tour: Tour, normalized_name: String, id: PlayerId) {
        self.by_name.insert((tour, normalized_name), id);
    }

    pub fn insert_provider(&mut self, provider_id: i64, id: PlayerId) {
        self.by_provider.insert(provider_id, id);
    }
}
