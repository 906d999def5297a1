//! Derived aggregates recomputed after a sync batch
//!
//! Player rank/points, rolling 365-day points and fantasy season stats. Each
//! aggregate first tries the store's server-side routine and falls back to
//! computing from match rows. A failure for one entity is logged and skipped.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tennis_core::{
    MatchStatus, PlayerId, SeasonStat, StoredMatch, TennisError, Tour, ROLLING_POINTS_WINDOW_DAYS,
};
use tennis_store::Store;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub players_ranked: u64,
    pub players_rolled: u64,
    pub season_stats_updated: u64,
    pub failures: u64,
    pub server_side: bool,
}

/// Inputs of a recompute pass
#[derive(Debug, Clone, Copy)]
pub struct RecomputeOptions {
    pub season: i32,
    pub today: NaiveDate,
    pub prefer_server_side: bool,
}

/// Latest positive (rank, points) observation of a player.
///
/// Most recent by match date; among matches on the same date the row inserted
/// last wins. Matches on or before `ranked_on`, the date of the player's
/// newest ranking snapshot, carry stale ranks and are ignored.
pub fn latest_ranking_observation(
    player: PlayerId,
    matches: &[StoredMatch],
    ranked_on: Option<NaiveDate>,
) -> Option<(i32, Option<i32>)> {
    matches
        .iter()
        .filter(|m| ranked_on.map_or(true, |ranked_on| m.record.match_date > ranked_on))
        .filter_map(|m| {
            let side = m.record.side_of(player)?;
            let rank = side.ranking_before.filter(|r| *r > 0)?;
            Some(((m.record.match_date, m.id), (rank, side.ranking_points_before)))
        })
        .max_by_key(|(order, _)| *order)
        .map(|(_, observation)| observation)
}

/// Points earned on or after `since`
pub fn rolling_points(player: PlayerId, matches: &[StoredMatch], since: NaiveDate) -> i32 {
    matches
        .iter()
        .filter(|m| m.record.match_date >= since)
        .map(|m| m.record.points_for_player(player))
        .sum()
}

/// Points a roster slot earned: completed matches on or after acquisition
pub fn season_points(stat: &SeasonStat, matches: &[StoredMatch]) -> i32 {
    matches
        .iter()
        .filter(|m| m.record.status == MatchStatus::Completed)
        .filter(|m| m.record.match_date >= stat.acquisition_date)
        .map(|m| m.record.points_for_player(stat.player_id))
        .sum()
}

/// First day of the trailing window; `today` is its last day
pub fn rolling_window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(ROLLING_POINTS_WINDOW_DAYS - 1)
}

struct Recompute<'a> {
    store: &'a dyn Store,
    options: RecomputeOptions,
    report: AggregateReport,
    matches: HashMap<PlayerId, Vec<StoredMatch>>,
}

impl<'a> Recompute<'a> {
    async fn matches_of(&mut self, player: PlayerId) -> Result<&[StoredMatch], TennisError> {
        if !self.matches.contains_key(&player) {
            let rows = self.store.matches_for_player(player).await?;
            self.matches.insert(player, rows);
        }
        Ok(self.matches.get(&player).map(Vec::as_slice).unwrap_or(&[]))
    }

    async fn rankings(&mut self, players: &[PlayerId]) {
        if self.options.prefer_server_side {
            match self.store.refresh_player_rankings().await {
                Ok(Some(affected)) => {
                    self.report.players_ranked = affected;
                    self.report.server_side = true;
                    return;
                }
                Ok(None) => {}
                Err(e) => warn!("Server-side ranking refresh failed, computing locally: {}", e),
            }
        }

        for &player in players {
            match self.rank_player(player).await {
                Ok(true) => self.report.players_ranked += 1,
                Ok(false) => {}
                Err(e) => self.fail(TennisError::aggregate(format!("ranking of player {}", player), e)),
            }
        }
    }

    async fn rolling(&mut self, players: &[PlayerId]) {
        let since = rolling_window_start(self.options.today);
        if self.options.prefer_server_side {
            match self.store.refresh_player_rolling_points(since).await {
                Ok(Some(affected)) => {
                    self.report.players_rolled = affected;
                    self.report.server_side = true;
                    return;
                }
                Ok(None) => {}
                Err(e) => warn!("Server-side rolling points refresh failed, computing locally: {}", e),
            }
        }

        for &player in players {
            match self.roll_player(player, since).await {
                Ok(()) => self.report.players_rolled += 1,
                Err(e) => self.fail(TennisError::aggregate(format!("rolling points of player {}", player), e)),
            }
        }
    }

    async fn season_stats(&mut self) {
        let season = self.options.season;
        if self.options.prefer_server_side {
            match self.store.refresh_season_stats(season).await {
                Ok(Some(affected)) => {
                    self.report.season_stats_updated = affected;
                    self.report.server_side = true;
                    return;
                }
                Ok(None) => {}
                Err(e) => warn!("Server-side season stats refresh failed, computing locally: {}", e),
            }
        }

        let stats = match self.store.active_season_stats(season).await {
            Ok(stats) => stats,
            Err(e) => {
                self.fail(TennisError::aggregate(format!("season {} stats", season), e));
                return;
            }
        };

        for stat in stats {
            match self.update_stat(&stat).await {
                Ok(()) => self.report.season_stats_updated += 1,
                Err(e) => self.fail(TennisError::aggregate(format!("season stat {}", stat.id), e)),
            }
        }
    }

    async fn rank_player(&mut self, player: PlayerId) -> Result<bool, TennisError> {
        let ranked_on = self.store.latest_ranking_date(player).await?;
        let observation = latest_ranking_observation(player, self.matches_of(player).await?, ranked_on);
        match observation {
            Some((rank, points)) => {
                self.store.update_player_ranking(player, Some(rank), points).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn roll_player(&mut self, player: PlayerId, since: NaiveDate) -> Result<(), TennisError> {
        let total = rolling_points(player, self.matches_of(player).await?, since);
        self.store.update_player_rolling_points(player, total).await?;
        Ok(())
    }

    async fn update_stat(&mut self, stat: &SeasonStat) -> Result<(), TennisError> {
        let points = season_points(stat, self.matches_of(stat.player_id).await?);
        if points != stat.points_earned {
            self.store.update_season_stat_points(stat.id, points).await?;
            debug!("Season stat {} now at {} points", stat.id, points);
        }
        Ok(())
    }

    fn fail(&mut self, err: TennisError) {
        warn!("{}", err);
        self.report.failures += 1;
    }
}

/// Recompute every aggregate for the given players and the season's roster rows
pub async fn recompute(store: &dyn Store, players: &[PlayerId], options: RecomputeOptions) -> AggregateReport {
    let mut pass = Recompute { store, options, report: AggregateReport::default(), matches: HashMap::new() };

    pass.rankings(players).await;
    pass.rolling(players).await;
    pass.season_stats().await;

    info!(
        "📊 Aggregates: {} ranked, {} rolled, {} season stats ({} failures{})",
        pass.report.players_ranked,
        pass.report.players_rolled,
        pass.report.season_stats_updated,
        pass.report.failures,
        if pass.report.server_side { ", server-side" } else { "" }
    );
    pass.report
}

/// Recompute for every stored player of both tours
pub async fn recompute_all(store: &dyn Store, options: RecomputeOptions) -> Result<AggregateReport, TennisError> {
    let mut players = Vec::new();
    for tour in Tour::ALL {
        players.extend(store.players_by_tour(tour).await?.into_iter().map(|p| p.id));
    }
    Ok(recompute(store, &players, options).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tennis_core::{CanonicalRound, MatchRecord, MatchSide};

    fn date(d: &str) -> NaiveDate {
        NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()
    }

    fn side(id: i64, rank: Option<i32>, points_before: Option<i32>, earned: i32) -> MatchSide {
        MatchSide {
            player_id: PlayerId(id),
            name: format!("p{}", id),
            ranking_before: rank,
            ranking_points_before: points_before,
            points_earned: earned,
        }
    }

    fn stored(id: i64, on: &str, p1: MatchSide, p2: MatchSide, status: MatchStatus) -> StoredMatch {
        StoredMatch {
            id,
            record: MatchRecord {
                tournament_name: "Dubai".to_string(),
                tournament_id: None,
                tournament_level: "WTA 1000".to_string(),
                round: CanonicalRound::QuarterFinal,
                surface: None,
                score: None,
                tour: Tour::Wta,
                match_date: date(on),
                player1: p1,
                player2: p2,
                status,
                provider_match_id: None,
                raw: None,
            },
        }
    }

    #[test]
    fn test_latest_observation_wins() {
        let matches = vec![
            stored(1, "2026-02-10", side(1, Some(12), Some(2900), 180), side(2, Some(30), None, 90), MatchStatus::Completed),
            stored(2, "2026-02-20", side(3, Some(4), None, 90), side(1, Some(10), Some(3100), 45), MatchStatus::Completed),
            stored(3, "2026-02-05", side(1, Some(15), Some(2500), 0), side(4, None, None, 0), MatchStatus::Completed),
        ];
        assert_eq!(latest_ranking_observation(PlayerId(1), &matches, None), Some((10, Some(3100))));
        assert_eq!(latest_ranking_observation(PlayerId(4), &matches, None), None);
    }

    #[test]
    fn test_observations_older_than_ranking_snapshot_ignored() {
        let matches = vec![
            stored(1, "2026-03-01", side(1, Some(3), Some(7000), 90), side(2, None, None, 45), MatchStatus::Completed),
            stored(2, "2026-03-30", side(1, Some(2), Some(8000), 0), side(2, None, None, 0), MatchStatus::Completed),
        ];
        assert_eq!(latest_ranking_observation(PlayerId(1), &matches, Some(date("2026-03-30"))), None);
        assert_eq!(
            latest_ranking_observation(PlayerId(1), &matches, Some(date("2026-03-15"))),
            Some((2, Some(8000)))
        );
    }

    #[test]
    fn test_same_day_tie_goes_to_last_inserted() {
        let matches = vec![
            stored(8, "2026-02-20", side(1, Some(9), None, 0), side(2, None, None, 0), MatchStatus::Completed),
            stored(5, "2026-02-20", side(1, Some(11), None, 0), side(3, None, None, 0), MatchStatus::Completed),
        ];
        assert_eq!(latest_ranking_observation(PlayerId(1), &matches, None), Some((9, None)));
    }

    #[test]
    fn test_non_positive_ranks_ignored() {
        let matches = vec![
            stored(1, "2026-02-10", side(1, Some(20), None, 0), side(2, None, None, 0), MatchStatus::Completed),
            stored(2, "2026-02-11", side(1, Some(0), None, 0), side(2, None, None, 0), MatchStatus::Completed),
        ];
        assert_eq!(latest_ranking_observation(PlayerId(1), &matches, None), Some((20, None)));
    }

    #[test]
    fn test_rolling_window() {
        let today = date("2026-10-19");
        let since = rolling_window_start(today);
        assert_eq!(since, date("2025-10-20"));
        assert_eq!((today - since).num_days() + 1, ROLLING_POINTS_WINDOW_DAYS);

        let matches = vec![
            stored(1, "2025-10-19", side(1, None, None, 500), side(2, None, None, 0), MatchStatus::Completed),
            stored(2, "2025-10-20", side(1, None, None, 300), side(2, None, None, 0), MatchStatus::Completed),
            stored(3, "2026-06-01", side(2, None, None, 90), side(1, None, None, 45), MatchStatus::Completed),
        ];
        assert_eq!(rolling_points(PlayerId(1), &matches, since), 345);
    }

    #[test]
    fn test_season_points_from_acquisition() {
        let stat = SeasonStat {
            id: 1,
            season: 2026,
            team_id: 3,
            player_id: PlayerId(1),
            acquisition_date: date("2026-03-01"),
            release_date: None,
            points_earned: 0,
        };
        let matches = vec![
            stored(1, "2026-02-28", side(1, None, None, 1000), side(2, None, None, 0), MatchStatus::Completed),
            stored(2, "2026-03-01", side(1, None, None, 500), side(2, None, None, 0), MatchStatus::Completed),
            stored(3, "2026-03-15", side(2, None, None, 0), side(1, None, None, 300), MatchStatus::Completed),
            stored(4, "2026-03-20", side(1, None, None, 0), side(2, None, None, 0), MatchStatus::Scheduled),
        ];
        assert_eq!(season_points(&stat, &matches), 800);
    }
}
