//! Store trait shared by the PostgreSQL and in-memory backends

use crate::error::Result;
use chrono::NaiveDate;
use tennis_core::{
    MatchKey, MatchRecord, NewPlayer, Player, PlayerId, RankingSnapshot, SeasonStat, StoredMatch,
    Tour, Tournament,
};

/// Row-level persistence used by the resolver, the sync engine and the rankings sync.
///
/// Every call is a single statement; nothing here opens a transaction.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // Players

    /// Look up a player by normalized name within a tour
    async fn find_player_by_name(&self, normalized_name: &str, tour: Tour) -> Result<Option<Player>>;

    async fn find_player_by_provider_id(&self, provider_id: i64) -> Result<Option<Player>>;

    async fn find_player(&self, id: PlayerId) -> Result<Option<Player>>;

    /// All players of a tour, used to warm resolver caches
    async fn players_by_tour(&self, tour: Tour) -> Result<Vec<Player>>;

    async fn insert_player(&self, player: &NewPlayer) -> Result<Player>;

    /// Refresh display name, country and provider id of an existing player
    async fn update_player_identity(
        &self,
        id: PlayerId,
        name: &str,
        country: Option<&str>,
        provider_id: Option<i64>,
    ) -> Result<()>;

    /// Write a fresh rank/points observation; `None` leaves the column untouched
    async fn update_player_ranking(&self, id: PlayerId, rank: Option<i32>, points: Option<i32>) -> Result<()>;

    async fn update_player_rolling_points(&self, id: PlayerId, rolling_points: i32) -> Result<()>;

    // Tournaments

    async fn find_tournament(&self, name: &str, tour: Tour) -> Result<Option<Tournament>>;

    async fn insert_tournament(&self, name: &str, tour: Tour, stage: &str) -> Result<Tournament>;

    // Matches

    async fn find_match(&self, key: &MatchKey) -> Result<Option<StoredMatch>>;

    async fn insert_match(&self, record: &MatchRecord) -> Result<StoredMatch>;

    /// Overwrite every column of an existing match row
    async fn replace_match(&self, id: i64, record: &MatchRecord) -> Result<StoredMatch>;

    /// Matches a player took part in, in insertion order
    async fn matches_for_player(&self, player: PlayerId) -> Result<Vec<StoredMatch>>;

    // Season stats and rankings

    /// Rows of a season with no release date
    async fn active_season_stats(&self, season: i32) -> Result<Vec<SeasonStat>>;

    async fn update_season_stat_points(&self, id: i64, points_earned: i32) -> Result<()>;

    /// Insert or overwrite the snapshot keyed on (player, date, tour)
    async fn upsert_ranking_snapshot(&self, snapshot: &RankingSnapshot) -> Result<()>;

    /// Date of the player's newest ranking snapshot
    async fn latest_ranking_date(&self, player: PlayerId) -> Result<Option<NaiveDate>>;

    // Server-side aggregation. `Ok(None)` means the backend has no routine
    // and the caller computes the aggregate itself.

    async fn refresh_player_rankings(&self) -> Result<Option<u64>> {
        Ok(None)
    }

    async fn refresh_player_rolling_points(&self, _since: NaiveDate) -> Result<Option<u64>> {
        Ok(None)
    }

    async fn refresh_season_stats(&self, _season: i32) -> Result<Option<u64>> {
        Ok(None)
    }
}
