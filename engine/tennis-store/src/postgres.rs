//! PostgreSQL store backed by sqlx

use crate::error::{Result, StoreError};
use crate::store::Store;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tennis_core::{
    MatchKey, MatchRecord, MatchSide, MatchStatus, NewPlayer, Player, PlayerId, RankingSnapshot,
    RoundMapper, RoundVocabulary, SeasonStat, StoredMatch, Tour, Tournament, TournamentId,
};
use tracing::{debug, info};

/// Undefined function; the aggregation routines are not installed
const UNDEFINED_FUNCTION: &str = "42883";

const PLAYER_COLUMNS: &str =
    "id, name, normalized_name, tour, rank, points, rolling_points, country, provider_id";

const MATCH_COLUMNS: &str = "id, provider_match_id, tournament_id, tournament_name, tournament_level, \
     round, surface, score, tour, match_date, \
     player1_id, player1_name, player1_ranking_before, player1_ranking_points_before, player1_points_earned, \
     player2_id, player2_name, player2_ranking_before, player2_ranking_points_before, player2_points_earned, \
     status, raw";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("Connected to database ({} max connections)", max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Call an aggregation routine returning an affected-row count
    async fn call_routine(&self, query: sqlx::query::QueryScalar<'_, sqlx::Postgres, i32, sqlx::postgres::PgArguments>) -> Result<Option<u64>> {
        match query.fetch_one(&self.pool).await {
            Ok(affected) => Ok(Some(affected.max(0) as u64)),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNDEFINED_FUNCTION) => {
                debug!("Aggregation routine not installed: {}", db.message());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_tour(value: &str) -> Result<Tour> {
    value.parse::<Tour>().map_err(StoreError::decode)
}

fn player_from_row(row: &PgRow) -> Result<Player> {
    let tour: String = row.try_get("tour")?;
    Ok(Player {
        id: PlayerId(row.try_get("id")?),
        name: row.try_get("name")?,
        normalized_name: row.try_get("normalized_name")?,
        tour: parse_tour(&tour)?,
        rank: row.try_get("rank")?,
        points: row.try_get("points")?,
        rolling_points: row.try_get("rolling_points")?,
        country: row.try_get("country")?,
        provider_id: row.try_get("provider_id")?,
    })
}

fn tournament_from_row(row: &PgRow) -> Result<Tournament> {
    let tour: String = row.try_get("tour")?;
    Ok(Tournament {
        id: TournamentId(row.try_get("id")?),
        name: row.try_get("name")?,
        tour: parse_tour(&tour)?,
        stage: row.try_get("stage")?,
    })
}

fn side_from_row(row: &PgRow, prefix: &str) -> Result<MatchSide> {
    Ok(MatchSide {
        player_id: PlayerId(row.try_get(format!("{}_id", prefix).as_str())?),
        name: row.try_get(format!("{}_name", prefix).as_str())?,
        ranking_before: row.try_get(format!("{}_ranking_before", prefix).as_str())?,
        ranking_points_before: row.try_get(format!("{}_ranking_points_before", prefix).as_str())?,
        points_earned: row.try_get(format!("{}_points_earned", prefix).as_str())?,
    })
}

fn match_from_row(row: &PgRow) -> Result<StoredMatch> {
    let tour: String = row.try_get("tour")?;
    let round: String = row.try_get("round")?;
    let status: String = row.try_get("status")?;
    let tournament_id: Option<i64> = row.try_get("tournament_id")?;

    let record = MatchRecord {
        tournament_name: row.try_get("tournament_name")?,
        tournament_id: tournament_id.map(TournamentId),
        tournament_level: row.try_get("tournament_level")?,
        round: RoundMapper::canonicalize(&round, RoundVocabulary::Text),
        surface: row.try_get("surface")?,
        score: row.try_get("score")?,
        tour: parse_tour(&tour)?,
        match_date: row.try_get("match_date")?,
        player1: side_from_row(row, "player1")?,
        player2: side_from_row(row, "player2")?,
        status: status.parse::<MatchStatus>().map_err(StoreError::decode)?,
        provider_match_id: row.try_get("provider_match_id")?,
        raw: row.try_get("raw")?,
    };
    Ok(StoredMatch { id: row.try_get("id")?, record })
}

fn season_stat_from_row(row: &PgRow) -> Result<SeasonStat> {
    Ok(SeasonStat {
        id: row.try_get("id")?,
        season: row.try_get("season")?,
        team_id: row.try_get("team_id")?,
        player_id: PlayerId(row.try_get("player_id")?),
        acquisition_date: row.try_get("acquisition_date")?,
        release_date: row.try_get("release_date")?,
        points_earned: row.try_get("points_earned")?,
    })
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn find_player_by_name(&self, normalized_name: &str, tour: Tour) -> Result<Option<Player>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM players WHERE normalized_name = $1 AND tour = $2 ORDER BY id LIMIT 1",
            PLAYER_COLUMNS
        ))
        .bind(normalized_name)
        .bind(tour.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(player_from_row).transpose()
    }

    async fn find_player_by_provider_id(&self, provider_id: i64) -> Result<Option<Player>> {
        let row = sqlx::query(&format!("SELECT {} FROM players WHERE provider_id = $1", PLAYER_COLUMNS))
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(player_from_row).transpose()
    }

    async fn find_player(&self, id: PlayerId) -> Result<Option<Player>> {
        let row = sqlx::query(&format!("SELECT {} FROM players WHERE id = $1", PLAYER_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(player_from_row).transpose()
    }

    async fn players_by_tour(&self, tour: Tour) -> Result<Vec<Player>> {
        let rows = sqlx::query(&format!("SELECT {} FROM players WHERE tour = $1 ORDER BY id", PLAYER_COLUMNS))
            .bind(tour.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(player_from_row).collect()
    }

    async fn insert_player(&self, player: &NewPlayer) -> Result<Player> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO players (name, normalized_name, tour, rank, points, country, provider_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PLAYER_COLUMNS
        ))
        .bind(&player.name)
        .bind(&player.normalized_name)
        .bind(player.tour.as_str())
        .bind(player.rank)
        .bind(player.points)
        .bind(&player.country)
        .bind(player.provider_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_write)?;
        player_from_row(&row)
    }

    async fn update_player_identity(
        &self,
        id: PlayerId,
        name: &str,
        country: Option<&str>,
        provider_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE players
            SET name = $2,
                normalized_name = $3,
                country = COALESCE($4, country),
                provider_id = COALESCE($5, provider_id),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(name)
        .bind(tennis_core::normalize(name))
        .bind(country)
        .bind(provider_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_player_ranking(&self, id: PlayerId, rank: Option<i32>, points: Option<i32>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE players
            SET rank = COALESCE($2, rank),
                points = COALESCE($3, points),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(rank)
        .bind(points)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_player_rolling_points(&self, id: PlayerId, rolling_points: i32) -> Result<()> {
        sqlx::query("UPDATE players SET rolling_points = $2, updated_at = NOW() WHERE id = $1")
            .bind(id.0)
            .bind(rolling_points)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_tournament(&self, name: &str, tour: Tour) -> Result<Option<Tournament>> {
        let row = sqlx::query("SELECT id, name, tour, stage FROM tournaments WHERE name = $1 AND tour = $2")
            .bind(name)
            .bind(tour.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn insert_tournament(&self, name: &str, tour: Tour, stage: &str) -> Result<Tournament> {
        let row = sqlx::query(
            "INSERT INTO tournaments (name, tour, stage) VALUES ($1, $2, $3) RETURNING id, name, tour, stage",
        )
        .bind(name)
        .bind(tour.as_str())
        .bind(stage)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_write)?;
        tournament_from_row(&row)
    }

    async fn find_match(&self, key: &MatchKey) -> Result<Option<StoredMatch>> {
        let row = match key {
            MatchKey::PairAndDate { low, high, date } => {
                sqlx::query(&format!(
                    r#"
                    SELECT {} FROM matches
                    WHERE LEAST(player1_id, player2_id) = $1
                      AND GREATEST(player1_id, player2_id) = $2
                      AND match_date = $3
                    "#,
                    MATCH_COLUMNS
                ))
                .bind(low.0)
                .bind(high.0)
                .bind(*date)
                .fetch_optional(&self.pool)
                .await?
            }
            MatchKey::ProviderMatchId(id) => {
                sqlx::query(&format!("SELECT {} FROM matches WHERE provider_match_id = $1", MATCH_COLUMNS))
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            MatchKey::PairInTournament { low, high, tournament, from, to } => {
                sqlx::query(&format!(
                    r#"
                    SELECT {} FROM matches
                    WHERE LEAST(player1_id, player2_id) = $1
                      AND GREATEST(player1_id, player2_id) = $2
                      AND tournament_id = $3
                      AND match_date BETWEEN $4 AND $5
                    ORDER BY match_date, id
                    LIMIT 1
                    "#,
                    MATCH_COLUMNS
                ))
                .bind(low.0)
                .bind(high.0)
                .bind(tournament.0)
                .bind(*from)
                .bind(*to)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        row.as_ref().map(match_from_row).transpose()
    }

    async fn insert_match(&self, record: &MatchRecord) -> Result<StoredMatch> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO matches (
                provider_match_id, tournament_id, tournament_name, tournament_level,
                round, surface, score, tour, match_date,
                player1_id, player1_name, player1_ranking_before, player1_ranking_points_before, player1_points_earned,
                player2_id, player2_name, player2_ranking_before, player2_ranking_points_before, player2_points_earned,
                status, raw
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING {}
            "#,
            MATCH_COLUMNS
        ))
        .bind(record.provider_match_id)
        .bind(record.tournament_id.map(|t| t.0))
        .bind(&record.tournament_name)
        .bind(&record.tournament_level)
        .bind(record.round.as_str())
        .bind(&record.surface)
        .bind(&record.score)
        .bind(record.tour.as_str())
        .bind(record.match_date)
        .bind(record.player1.player_id.0)
        .bind(&record.player1.name)
        .bind(record.player1.ranking_before)
        .bind(record.player1.ranking_points_before)
        .bind(record.player1.points_earned)
        .bind(record.player2.player_id.0)
        .bind(&record.player2.name)
        .bind(record.player2.ranking_before)
        .bind(record.player2.ranking_points_before)
        .bind(record.player2.points_earned)
        .bind(record.status.as_str())
        .bind(&record.raw)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_write)?;
        match_from_row(&row)
    }

    async fn replace_match(&self, id: i64, record: &MatchRecord) -> Result<StoredMatch> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE matches SET
                provider_match_id = $2, tournament_id = $3, tournament_name = $4, tournament_level = $5,
                round = $6, surface = $7, score = $8, tour = $9, match_date = $10,
                player1_id = $11, player1_name = $12, player1_ranking_before = $13,
                player1_ranking_points_before = $14, player1_points_earned = $15,
                player2_id = $16, player2_name = $17, player2_ranking_before = $18,
                player2_ranking_points_before = $19, player2_points_earned = $20,
                status = $21, raw = $22, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            MATCH_COLUMNS
        ))
        .bind(id)
        .bind(record.provider_match_id)
        .bind(record.tournament_id.map(|t| t.0))
        .bind(&record.tournament_name)
        .bind(&record.tournament_level)
        .bind(record.round.as_str())
        .bind(&record.surface)
        .bind(&record.score)
        .bind(record.tour.as_str())
        .bind(record.match_date)
        .bind(record.player1.player_id.0)
        .bind(&record.player1.name)
        .bind(record.player1.ranking_before)
        .bind(record.player1.ranking_points_before)
        .bind(record.player1.points_earned)
        .bind(record.player2.player_id.0)
        .bind(&record.player2.name)
        .bind(record.player2.ranking_before)
        .bind(record.player2.ranking_points_before)
        .bind(record.player2.points_earned)
        .bind(record.status.as_str())
        .bind(&record.raw)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { entity: "match", id })?;
        match_from_row(&row)
    }

    async fn matches_for_player(&self, player: PlayerId) -> Result<Vec<StoredMatch>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM matches WHERE player1_id = $1 OR player2_id = $1 ORDER BY id",
            MATCH_COLUMNS
        ))
        .bind(player.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(match_from_row).collect()
    }

    async fn active_season_stats(&self, season: i32) -> Result<Vec<SeasonStat>> {
        let rows = sqlx::query(
            r#"
            SELECT id, season, team_id, player_id, acquisition_date, release_date, points_earned
            FROM season_stats
            WHERE season = $1 AND release_date IS NULL
            ORDER BY id
            "#,
        )
        .bind(season)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(season_stat_from_row).collect()
    }

    async fn update_season_stat_points(&self, id: i64, points_earned: i32) -> Result<()> {
        sqlx::query("UPDATE season_stats SET points_earned = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(points_earned)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_ranking_snapshot(&self, snapshot: &RankingSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO player_rankings (player_id, ranking_date, ranking_type, rank, points,
                                         ranking_movement, tournaments_played, raw)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (player_id, ranking_date, ranking_type)
            DO UPDATE SET
                rank = EXCLUDED.rank,
                points = EXCLUDED.points,
                ranking_movement = EXCLUDED.ranking_movement,
                tournaments_played = EXCLUDED.tournaments_played,
                raw = EXCLUDED.raw
            "#,
        )
        .bind(snapshot.player_id.0)
        .bind(snapshot.ranking_date)
        .bind(snapshot.tour.ranking_type())
        .bind(snapshot.rank)
        .bind(snapshot.points)
        .bind(snapshot.ranking_movement)
        .bind(snapshot.tournaments_played)
        .bind(&snapshot.raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_ranking_date(&self, player: PlayerId) -> Result<Option<NaiveDate>> {
        let latest: Option<NaiveDate> =
            sqlx::query_scalar("SELECT MAX(ranking_date) FROM player_rankings WHERE player_id = $1")
                .bind(player.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }

    async fn refresh_player_rankings(&self) -> Result<Option<u64>> {
        self.call_routine(sqlx::query_scalar("SELECT update_player_rankings_from_matches()")).await
    }

    async fn refresh_player_rolling_points(&self, since: NaiveDate) -> Result<Option<u64>> {
        self.call_routine(sqlx::query_scalar("SELECT update_player_points_from_matches($1)").bind(since))
            .await
    }

    async fn refresh_season_stats(&self, season: i32) -> Result<Option<u64>> {
        self.call_routine(sqlx::query_scalar("SELECT update_season_stats_points($1)").bind(season)).await
    }
}
