//! In-memory store for tests and dry runs

use crate::error::{Result, StoreError};
use crate::store::Store;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tennis_core::{
    MatchKey, MatchRecord, NewPlayer, Player, PlayerId, RankingSnapshot, SeasonStat, StoredMatch,
    Tour, Tournament, TournamentId,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    players: Vec<Player>,
    tournaments: Vec<Tournament>,
    matches: Vec<StoredMatch>,
    season_stats: Vec<SeasonStat>,
    rankings: Vec<RankingSnapshot>,
    next_id: i64,
    failing_ranking_updates: HashSet<PlayerId>,
    failing_season_stats: HashSet<i64>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound { entity: "player", id: id.0 })
    }
}

/// Vector-backed [`Store`] with the same key semantics as the PostgreSQL schema
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    failing_match_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` match inserts/replaces fail
    pub fn fail_next_match_writes(&self, count: usize) {
        self.failing_match_writes.store(count, Ordering::SeqCst);
    }

    /// Make every rank/points update of `player` fail
    pub async fn fail_ranking_updates(&self, player: PlayerId) {
        self.state.write().await.failing_ranking_updates.insert(player);
    }

    /// Make every points update of the season stat `id` fail
    pub async fn fail_season_stat_updates(&self, id: i64) {
        self.state.write().await.failing_season_stats.insert(id);
    }

    /// Add a roster row; returns it with its assigned id
    pub async fn add_season_stat(
        &self,
        season: i32,
        team_id: i64,
        player_id: PlayerId,
        acquisition_date: NaiveDate,
        release_date: Option<NaiveDate>,
    ) -> SeasonStat {
        let mut state = self.state.write().await;
        let stat = SeasonStat {
            id: state.allocate_id(),
            season,
            team_id,
            player_id,
            acquisition_date,
            release_date,
            points_earned: 0,
        };
        state.season_stats.push(stat.clone());
        stat
    }

    pub async fn players(&self) -> Vec<Player> {
        self.state.read().await.players.clone()
    }

    pub async fn tournaments(&self) -> Vec<Tournament> {
        self.state.read().await.tournaments.clone()
    }

    pub async fn matches(&self) -> Vec<StoredMatch> {
        self.state.read().await.matches.clone()
    }

    pub async fn season_stats(&self) -> Vec<SeasonStat> {
        self.state.read().await.season_stats.clone()
    }

    pub async fn rankings(&self) -> Vec<RankingSnapshot> {
        self.state.read().await.rankings.clone()
    }

    fn take_injected_failure(&self) -> Result<()> {
        let remaining = self.failing_match_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_match_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Simulated("match write rejected".to_string()));
        }
        Ok(())
    }
}

fn key_of(record: &MatchRecord) -> MatchKey {
    MatchKey::pair(record.player1.player_id, record.player2.player_id, record.match_date)
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn find_player_by_name(&self, normalized_name: &str, tour: Tour) -> Result<Option<Player>> {
        let state = self.state.read().await;
        Ok(state
            .players
            .iter()
            .find(|p| p.tour == tour && p.normalized_name == normalized_name)
            .cloned())
    }

    async fn find_player_by_provider_id(&self, provider_id: i64) -> Result<Option<Player>> {
        let state = self.state.read().await;
        Ok(state.players.iter().find(|p| p.provider_id == Some(provider_id)).cloned())
    }

    async fn find_player(&self, id: PlayerId) -> Result<Option<Player>> {
        let state = self.state.read().await;
        Ok(state.players.iter().find(|p| p.id == id).cloned())
    }

    async fn players_by_tour(&self, tour: Tour) -> Result<Vec<Player>> {
        let state = self.state.read().await;
        Ok(state.players.iter().filter(|p| p.tour == tour).cloned().collect())
    }

    async fn insert_player(&self, player: &NewPlayer) -> Result<Player> {
        let mut state = self.state.write().await;
        if let Some(provider_id) = player.provider_id {
            if state.players.iter().any(|p| p.provider_id == Some(provider_id)) {
                return Err(StoreError::Conflict(format!("provider id {} already taken", provider_id)));
            }
        } else if state.players.iter().any(|p| {
            p.provider_id.is_none()
                && p.tour == player.tour
                && p.normalized_name == player.normalized_name
        }) {
            return Err(StoreError::Conflict(format!(
                "player '{}' already exists on {}",
                player.normalized_name, player.tour
            )));
        }

        let created = Player {
            id: PlayerId(state.allocate_id()),
            name: player.name.clone(),
            normalized_name: player.normalized_name.clone(),
            tour: player.tour,
            rank: Some(player.rank),
            points: player.points,
            rolling_points: 0,
            country: player.country.clone(),
            provider_id: player.provider_id,
        };
        state.players.push(created.clone());
        Ok(created)
    }

    async fn update_player_identity(
        &self,
        id: PlayerId,
        name: &str,
        country: Option<&str>,
        provider_id: Option<i64>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let player = state.player_mut(id)?;
        player.name = name.to_string();
        player.normalized_name = tennis_core::normalize(name);
        if let Some(country) = country {
            player.country = Some(country.to_string());
        }
        if provider_id.is_some() {
            player.provider_id = provider_id;
        }
        Ok(())
    }

    async fn update_player_ranking(&self, id: PlayerId, rank: Option<i32>, points: Option<i32>) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing_ranking_updates.contains(&id) {
            return Err(StoreError::Simulated(format!("ranking update of player {} rejected", id)));
        }
        let player = state.player_mut(id)?;
        if let Some(rank) = rank {
            player.rank = Some(rank);
        }
        if let Some(points) = points {
            player.points = points;
        }
        Ok(())
    }

    async fn update_player_rolling_points(&self, id: PlayerId, rolling_points: i32) -> Result<()> {
        let mut state = self.state.write().await;
        state.player_mut(id)?.rolling_points = rolling_points;
        Ok(())
    }

    async fn find_tournament(&self, name: &str, tour: Tour) -> Result<Option<Tournament>> {
        let state = self.state.read().await;
        Ok(state.tournaments.iter().find(|t| t.name == name && t.tour == tour).cloned())
    }

    async fn insert_tournament(&self, name: &str, tour: Tour, stage: &str) -> Result<Tournament> {
        let mut state = self.state.write().await;
        if state.tournaments.iter().any(|t| t.name == name && t.tour == tour) {
            return Err(StoreError::Conflict(format!("tournament '{}' already exists on {}", name, tour)));
        }
        let tournament = Tournament {
            id: TournamentId(state.allocate_id()),
            name: name.to_string(),
            tour,
            stage: stage.to_string(),
        };
        state.tournaments.push(tournament.clone());
        Ok(tournament)
    }

    async fn find_match(&self, key: &MatchKey) -> Result<Option<StoredMatch>> {
        let state = self.state.read().await;
        Ok(state.matches.iter().find(|m| key.matches(&m.record)).cloned())
    }

    async fn insert_match(&self, record: &MatchRecord) -> Result<StoredMatch> {
        self.take_injected_failure()?;
        let mut state = self.state.write().await;
        let key = key_of(record);
        if state.matches.iter().any(|m| key_of(&m.record) == key) {
            return Err(StoreError::Conflict(format!("match {:?} already exists", key)));
        }
        if let Some(provider_id) = record.provider_match_id {
            if state.matches.iter().any(|m| m.record.provider_match_id == Some(provider_id)) {
                return Err(StoreError::Conflict(format!("provider match {} already exists", provider_id)));
            }
        }
        let stored = StoredMatch { id: state.allocate_id(), record: record.clone() };
        state.matches.push(stored.clone());
        Ok(stored)
    }

    async fn replace_match(&self, id: i64, record: &MatchRecord) -> Result<StoredMatch> {
        self.take_injected_failure()?;
        let mut state = self.state.write().await;
        let existing = state
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound { entity: "match", id })?;
        existing.record = record.clone();
        Ok(existing.clone())
    }

    async fn matches_for_player(&self, player: PlayerId) -> Result<Vec<StoredMatch>> {
        let state = self.state.read().await;
        Ok(state.matches.iter().filter(|m| m.record.involves(player)).cloned().collect())
    }

    async fn active_season_stats(&self, season: i32) -> Result<Vec<SeasonStat>> {
        let state = self.state.read().await;
        Ok(state
            .season_stats
            .iter()
            .filter(|s| s.season == season && s.release_date.is_none())
            .cloned()
            .collect())
    }

    async fn update_season_stat_points(&self, id: i64, points_earned: i32) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing_season_stats.contains(&id) {
            return Err(StoreError::Simulated(format!("season stat {} update rejected", id)));
        }
        let stat = state
            .season_stats
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound { entity: "season stat", id })?;
        stat.points_earned = points_earned;
        Ok(())
    }

    async fn upsert_ranking_snapshot(&self, snapshot: &RankingSnapshot) -> Result<()> {
        let mut state = self.state.write().await;
        match state.rankings.iter_mut().find(|r| {
            r.player_id == snapshot.player_id
                && r.ranking_date == snapshot.ranking_date
                && r.tour == snapshot.tour
        }) {
            Some(existing) => *existing = snapshot.clone(),
            None => state.rankings.push(snapshot.clone()),
        }
        Ok(())
    }

    async fn latest_ranking_date(&self, player: PlayerId) -> Result<Option<NaiveDate>> {
        let state = self.state.read().await;
        Ok(state.rankings.iter().filter(|r| r.player_id == player).map(|r| r.ranking_date).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tennis_core::{CanonicalRound, MatchSide, MatchStatus};

    fn side(id: PlayerId) -> MatchSide {
        MatchSide {
            player_id: id,
            name: format!("player {}", id),
            ranking_before: None,
            ranking_points_before: None,
            points_earned: 0,
        }
    }

    fn record(p1: PlayerId, p2: PlayerId, date: NaiveDate) -> MatchRecord {
        MatchRecord {
            tournament_name: "Adelaide International".to_string(),
            tournament_id: None,
            tournament_level: "ATP 250".to_string(),
            round: CanonicalRound::Final,
            surface: Some("Hard".to_string()),
            score: Some("6-3, 6-4".to_string()),
            tour: Tour::Atp,
            match_date: date,
            player1: side(p1),
            player2: side(p2),
            status: MatchStatus::Completed,
            provider_match_id: None,
            raw: None,
        }
    }

    #[tokio::test]
    async fn test_player_name_uniqueness_per_tour() {
        let store = MemoryStore::new();
        let new = NewPlayer::provisional("Alex de Minaur", Tour::Atp, None, None);
        let created = store.insert_player(&new).await.unwrap();
        assert!(store.insert_player(&new).await.is_err());

        let other_tour = NewPlayer::provisional("Alex de Minaur", Tour::Wta, None, None);
        assert!(store.insert_player(&other_tour).await.is_ok());

        let found = store.find_player_by_name("alex de minaur", Tour::Atp).await.unwrap();
        assert_eq!(found.map(|p| p.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_match_lookup_ignores_side_order() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let stored = store.insert_match(&record(PlayerId(1), PlayerId(2), date)).await.unwrap();

        let swapped = MatchKey::pair(PlayerId(2), PlayerId(1), date);
        assert_eq!(store.find_match(&swapped).await.unwrap().map(|m| m.id), Some(stored.id));
        assert!(store.insert_match(&record(PlayerId(2), PlayerId(1), date)).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        store.fail_next_match_writes(1);
        assert!(store.insert_match(&record(PlayerId(1), PlayerId(2), date)).await.is_err());
        assert!(store.insert_match(&record(PlayerId(1), PlayerId(2), date)).await.is_ok());
    }

    #[tokio::test]
    async fn test_ranking_snapshot_upsert() {
        let store = MemoryStore::new();
        let mut snapshot = RankingSnapshot {
            player_id: PlayerId(4),
            ranking_date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            tour: Tour::Wta,
            rank: 5,
            points: 4100,
            ranking_movement: Some(1),
            tournaments_played: Some(18),
            raw: None,
        };
        store.upsert_ranking_snapshot(&snapshot).await.unwrap();
        snapshot.points = 4200;
        store.upsert_ranking_snapshot(&snapshot).await.unwrap();

        let rankings = store.rankings().await;
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[0].points, 4200);
    }
}
