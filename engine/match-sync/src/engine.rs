//! Sync engine: persists canonical match records at most once per natural key

use crate::aggregates::{self, AggregateReport, RecomputeOptions};
use crate::builder::{MatchRecordBuilder, Rejection, UnknownRoundPolicy};
use crate::dump::FailedRecord;
use chrono::{Datelike, NaiveDate, Utc};
use player_registry::{PlayerRegistry, PlayerResolver};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tennis_core::{KeyPolicy, MatchKey, MatchRecord, PlayerId, SourceEvent, TennisError, Tour, TournamentId};
use tennis_store::Store;
use tracing::{debug, error, info, warn};

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub unknown_round: UnknownRoundPolicy,

    /// Fantasy season whose roster rows are recomputed
    pub season: i32,

    /// Try the store's aggregation routines before computing locally
    pub prefer_server_side_aggregation: bool,

    pub recompute_aggregates: bool,

    /// Reference date for the rolling window; today when unset
    pub as_of: Option<NaiveDate>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            unknown_round: UnknownRoundPolicy::default(),
            season: Utc::now().year(),
            prefer_server_side_aggregation: true,
            recompute_aggregates: true,
            as_of: None,
        }
    }
}

/// Terminal state of one record
#[derive(Debug)]
pub enum RecordOutcome {
    Inserted,
    UpdatedInPlace,
    SkippedDuplicate,
    Rejected(Rejection),
    Failed(TennisError),
}

/// Counts for one batch plus the records that failed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub failed: usize,
    pub failures: Vec<FailedRecord>,
    pub aggregates: Option<AggregateReport>,
}

impl SyncSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.skipped + self.rejected + self.failed
    }

    pub fn wrote_anything(&self) -> bool {
        self.inserted + self.updated > 0
    }

    /// Fold another batch's counts into this one
    pub fn absorb(&mut self, other: SyncSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.rejected += other.rejected;
        self.failed += other.failed;
        self.failures.extend(other.failures);
        if other.aggregates.is_some() {
            self.aggregates = other.aggregates;
        }
    }
}

/// Drives events through the builder and the store.
///
/// One engine is one run: the resolver and tournament caches live as long as
/// the engine does.
pub struct SyncEngine<R: PlayerResolver = PlayerRegistry> {
    store: Arc<dyn Store>,
    resolver: R,
    builder: MatchRecordBuilder,
    config: SyncConfig,
    tournaments: HashMap<(String, Tour), TournamentId>,
}

impl SyncEngine<PlayerRegistry> {
    pub fn new(store: Arc<dyn Store>, config: SyncConfig) -> Self {
        let resolver = PlayerRegistry::new(store.clone());
        Self::with_resolver(store, resolver, config)
    }

    /// Warm the resolver with every stored player
    pub async fn preload_players(&mut self) -> Result<usize, TennisError> {
        let mut total = 0;
        for tour in Tour::ALL {
            total += self.resolver.preload(tour).await?;
        }
        Ok(total)
    }
}

impl<R: PlayerResolver> SyncEngine<R> {
    pub fn with_resolver(store: Arc<dyn Store>, resolver: R, config: SyncConfig) -> Self {
        Self {
            store,
            builder: MatchRecordBuilder::new(config.unknown_round),
            resolver,
            config,
            tournaments: HashMap::new(),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn recompute_options(&self) -> RecomputeOptions {
        RecomputeOptions {
            season: self.config.season,
            today: self.config.as_of.unwrap_or_else(|| Utc::now().date_naive()),
            prefer_server_side: self.config.prefer_server_side_aggregation,
        }
    }

    /// Sync a batch of events and recompute aggregates if anything was written.
    ///
    /// No record aborts the batch: failures are counted and kept with their
    /// source event.
    pub async fn sync_batch(&mut self, events: Vec<SourceEvent>, key_policy: KeyPolicy) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let mut affected = BTreeSet::new();

        info!("🔄 Syncing {} events ({:?} key)", events.len(), key_policy);

        for event in events {
            let (outcome, players) = self.sync_event(&event, key_policy).await;
            match outcome {
                RecordOutcome::Inserted => summary.inserted += 1,
                RecordOutcome::UpdatedInPlace => summary.updated += 1,
                RecordOutcome::SkippedDuplicate => summary.skipped += 1,
                RecordOutcome::Rejected(rejection) if rejection.is_failure() => {
                    warn!("Failed to build record: {}", rejection);
                    summary.failed += 1;
                    summary.failures.push(FailedRecord { event, error: rejection.to_string() });
                }
                RecordOutcome::Rejected(rejection) => {
                    debug!("Rejected record: {}", rejection);
                    summary.rejected += 1;
                }
                RecordOutcome::Failed(err) => {
                    error!("Failed to persist record: {}", err);
                    summary.failed += 1;
                    summary.failures.push(FailedRecord { event, error: err.to_string() });
                }
            }
            affected.extend(players);
        }

        if summary.wrote_anything() && self.config.recompute_aggregates {
            let players: Vec<PlayerId> = affected.into_iter().collect();
            let report = aggregates::recompute(self.store.as_ref(), &players, self.recompute_options()).await;
            summary.aggregates = Some(report);
        }

        info!(
            "✅ Sync complete: {} inserted, {} updated, {} skipped, {} rejected, {} failed",
            summary.inserted, summary.updated, summary.skipped, summary.rejected, summary.failed
        );
        summary
    }

    /// Run one event through build, tournament resolution and persistence.
    ///
    /// Returns the players whose aggregates the write touched.
    pub async fn sync_event(&mut self, event: &SourceEvent, key_policy: KeyPolicy) -> (RecordOutcome, Vec<PlayerId>) {
        let mut record = match self.builder.build(event, &mut self.resolver).await {
            Ok(record) => record,
            Err(rejection) => return (RecordOutcome::Rejected(rejection), Vec::new()),
        };

        match self.persist(&mut record, key_policy).await {
            Ok(outcome) => {
                let players = match outcome {
                    RecordOutcome::Inserted | RecordOutcome::UpdatedInPlace => {
                        vec![record.player1.player_id, record.player2.player_id]
                    }
                    _ => Vec::new(),
                };
                (outcome, players)
            }
            Err(err) => (RecordOutcome::Failed(err), Vec::new()),
        }
    }

    async fn persist(&mut self, record: &mut MatchRecord, key_policy: KeyPolicy) -> Result<RecordOutcome, TennisError> {
        record.tournament_id = Some(self.tournament_id(&record.tournament_name, record.tour, &record.tournament_level).await?);

        // Events without a provider id fall back to the pair key
        let key = record
            .natural_key(key_policy)
            .or_else(|| record.natural_key(KeyPolicy::PairAndDate))
            .ok_or_else(|| TennisError::malformed("match has no natural key"))?;

        let mut existing = self.store.find_match(&key).await?;
        if existing.is_none() && matches!(key, MatchKey::ProviderMatchId(_)) {
            // Same pair and date stored by another source: adopt that row
            if let Some(pair) = record.natural_key(KeyPolicy::PairAndDate) {
                existing = self.store.find_match(&pair).await?;
            }
        }

        match (key, existing) {
            (MatchKey::ProviderMatchId(_), Some(existing)) => {
                self.store.replace_match(existing.id, record).await?;
                debug!("Replaced match {} ({:?})", existing.id, key);
                Ok(RecordOutcome::UpdatedInPlace)
            }
            (MatchKey::PairAndDate { .. } | MatchKey::PairInTournament { .. }, Some(existing)) => {
                debug!("Match {} already stored for {:?}", existing.id, key);
                Ok(RecordOutcome::SkippedDuplicate)
            }
            (_, None) => {
                let stored = self.store.insert_match(record).await?;
                debug!(
                    "Inserted match {}: {} vs {} ({})",
                    stored.id, record.player1.name, record.player2.name, record.match_date
                );
                Ok(RecordOutcome::Inserted)
            }
        }
    }

    /// Resolve or create a tournament, cached per (name, tour)
    async fn tournament_id(&mut self, name: &str, tour: Tour, stage: &str) -> Result<TournamentId, TennisError> {
        let key = (name.to_string(), tour);
        if let Some(id) = self.tournaments.get(&key) {
            return Ok(*id);
        }

        let tournament = match self.store.find_tournament(name, tour).await? {
            Some(existing) => existing,
            None => {
                let created = self.store.insert_tournament(name, tour, stage).await?;
                info!("🏟️ Created {} tournament '{}' ({})", tour, name, stage);
                created
            }
        };
        self.tournaments.insert(key, tournament.id);
        Ok(tournament.id)
    }

    /// Recompute aggregates for every stored player regardless of what this run wrote
    pub async fn recompute_all(&self) -> Result<AggregateReport, TennisError> {
        aggregates::recompute_all(self.store.as_ref(), self.recompute_options()).await
    }
}
