use crate::types::{IdentityCache, ResolvedPlayer, ResolverStats};
use std::sync::Arc;
use tennis_core::{normalize, NewPlayer, Player, PlayerId, ProviderPlayer, Result, TennisError, Tour};
use tennis_store::{Store, StoreError};
use tracing::{debug, info};

/// Maps a participant reference to a stable player identity.
///
/// Implementations decide how names are disambiguated; the sync engine only
/// relies on the same input yielding the same id within one resolver.
#[async_trait::async_trait]
pub trait PlayerResolver: Send {
    /// Resolve a display name within a tour, creating the player when unknown.
    ///
    /// Returns `None` only when the name normalizes to nothing.
    async fn resolve(
        &mut self,
        name: &str,
        tour: Tour,
        observed_rank: Option<i32>,
        observed_points: Option<i32>,
    ) -> Result<Option<ResolvedPlayer>>;

    /// Resolve a player the live API identified by its own id
    async fn resolve_provider(&mut self, player: &ProviderPlayer, tour: Tour) -> Result<ResolvedPlayer>;
}

/// Player Registry - resolves players by normalized name or provider id
///
/// Lookups go cache, then store, then create. The cache lives as long as the
/// registry, which the sync engine scopes to one run.
pub struct PlayerRegistry {
    store: Arc<dyn Store>,
    cache: IdentityCache,
    stats: ResolverStats,
}

impl PlayerRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, cache: IdentityCache::new(), stats: ResolverStats::default() }
    }

    /// Warm the name cache with every stored player of a tour
    pub async fn preload(&mut self, tour: Tour) -> Result<usize> {
        let players = self
            .store
            .players_by_tour(tour)
            .await
            .map_err(|e| resolution_error("*", tour, e))?;

        for player in &players {
            self.remember(player);
        }
        info!("Preloaded {} {} players into the registry", players.len(), tour);
        Ok(players.len())
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    fn remember(&mut self, player: &Player) {
        self.cache.insert_name(player.tour, player.normalized_name.clone(), player.id);
        if let Some(provider_id) = player.provider_id {
            self.cache.insert_provider(provider_id, player.id);
        }
    }

    async fn find_or_create(&mut self, new: NewPlayer) -> std::result::Result<ResolvedPlayer, StoreError> {
        let existing = match new.provider_id {
            Some(provider_id) => self.store.find_player_by_provider_id(provider_id).await?,
            None => self.store.find_player_by_name(&new.normalized_name, new.tour).await?,
        };
        if let Some(player) = existing {
            self.stats.store_hits += 1;
            self.remember(&player);
            return Ok(ResolvedPlayer { id: player.id, created: false });
        }

        let created = match self.store.insert_player(&new).await {
            Ok(player) => player,
            // Another writer created the same key between our lookup and insert
            Err(StoreError::Conflict(_)) => {
                let retry = match new.provider_id {
                    Some(provider_id) => self.store.find_player_by_provider_id(provider_id).await?,
                    None => self.store.find_player_by_name(&new.normalized_name, new.tour).await?,
                };
                let player = retry.ok_or_else(|| {
                    StoreError::Conflict(format!("player '{}' vanished after conflict", new.normalized_name))
                })?;
                self.remember(&player);
                return Ok(ResolvedPlayer { id: player.id, created: false });
            }
            Err(e) => return Err(e),
        };

        info!("🆕 Created {} player '{}' (id {}, rank {})", created.tour, created.name, created.id, new.rank);
        self.stats.created += 1;
        self.remember(&created);
        Ok(ResolvedPlayer { id: created.id, created: true })
    }

    /// Attach a provider id to a name-resolved player or refresh a known one
    async fn refresh_identity(
        &mut self,
        existing: &Player,
        player: &ProviderPlayer,
    ) -> std::result::Result<(), StoreError> {
        let country = player.country_code.as_deref().or(player.country.as_deref());
        let stale = existing.name != player.name
            || existing.provider_id != Some(player.id)
            || (country.is_some() && existing.country.as_deref() != country);
        if stale {
            debug!("Refreshing identity of player {} from provider id {}", existing.id, player.id);
            self.store
                .update_player_identity(existing.id, &player.name, country, Some(player.id))
                .await?;
        }
        Ok(())
    }
}

fn resolution_error(name: &str, tour: Tour, err: StoreError) -> TennisError {
    TennisError::IdentityResolution { name: name.to_string(), tour, message: err.to_string() }
}

#[async_trait::async_trait]
impl PlayerResolver for PlayerRegistry {
    async fn resolve(
        &mut self,
        name: &str,
        tour: Tour,
        observed_rank: Option<i32>,
        observed_points: Option<i32>,
    ) -> Result<Option<ResolvedPlayer>> {
        let normalized = normalize(name);
        if normalized.is_empty() {
            return Ok(None);
        }

        if let Some(id) = self.cache.get_name(tour, &normalized) {
            self.stats.cache_hits += 1;
            return Ok(Some(ResolvedPlayer { id, created: false }));
        }

        let new = NewPlayer::provisional(name, tour, observed_rank, observed_points);
        self.find_or_create(new)
            .await
            .map(Some)
            .map_err(|e| resolution_error(name, tour, e))
    }

    async fn resolve_provider(&mut self, player: &ProviderPlayer, tour: Tour) -> Result<ResolvedPlayer> {
        if let Some(id) = self.cache.get_provider(player.id) {
            self.stats.cache_hits += 1;
            return Ok(ResolvedPlayer { id, created: false });
        }

        let lookup = async {
            if let Some(existing) = self.store.find_player_by_provider_id(player.id).await? {
                return Ok::<_, StoreError>(Some(existing));
            }
            // A player first seen by name gets the provider id attached
            let by_name = self.store.find_player_by_name(&normalize(&player.name), tour).await?;
            Ok(by_name.filter(|p| p.provider_id.is_none()))
        }
        .await
        .map_err(|e| resolution_error(&player.name, tour, e))?;

        if let Some(existing) = lookup {
            self.refresh_identity(&existing, player)
                .await
                .map_err(|e| resolution_error(&player.name, tour, e))?;
            self.stats.store_hits += 1;
            self.cache.insert_name(tour, normalize(&player.name), existing.id);
            self.cache.insert_provider(player.id, existing.id);
            return Ok(ResolvedPlayer { id: existing.id, created: false });
        }

        let mut new = NewPlayer::provisional(&player.name, tour, player.ranking, None);
        new.country = player.country_code.clone().or_else(|| player.country.clone());
        new.provider_id = Some(player.id);
        self.find_or_create(new)
            .await
            .map_err(|e| resolution_error(&player.name, tour, e))
    }
}

/// Resolve a name and return only the id; convenience for callers without observations
pub async fn resolve_id<R: PlayerResolver + ?Sized>(
    resolver: &mut R,
    name: &str,
    tour: Tour,
) -> Result<Option<PlayerId>> {
    Ok(resolver.resolve(name, tour, None, None).await?.map(|r| r.id))
}
