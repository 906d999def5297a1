//! Provider ranking tables: player upsert by provider id plus one dated snapshot per player

use crate::models::ApiRankingEntry;
use chrono::NaiveDate;
use player_registry::PlayerResolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tennis_core::{RankingSnapshot, TennisError, Tour};
use tennis_store::Store;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingsSummary {
    pub upserted: usize,
    pub players_created: usize,
    pub failed: usize,
}

/// Sync one tour's rankings payload dated `ranking_date`.
///
/// Rows that fail to decode or persist are counted and skipped.
pub async fn sync_rankings<R: PlayerResolver + ?Sized>(
    store: &dyn Store,
    resolver: &mut R,
    tour: Tour,
    payload: &Value,
    ranking_date: NaiveDate,
) -> RankingsSummary {
    let mut summary = RankingsSummary::default();
    let rows = payload.get("rankings").and_then(Value::as_array).cloned().unwrap_or_default();

    for row in rows {
        match sync_row(store, resolver, tour, &row, ranking_date).await {
            Ok(created) => {
                summary.upserted += 1;
                if created {
                    summary.players_created += 1;
                }
            }
            Err(e) => {
                warn!("Failed to sync {} ranking row: {}", tour, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "🏆 {} rankings synced: {} upserted ({} new players), {} failed",
        tour, summary.upserted, summary.players_created, summary.failed
    );
    summary
}

async fn sync_row<R: PlayerResolver + ?Sized>(
    store: &dyn Store,
    resolver: &mut R,
    tour: Tour,
    row: &Value,
    ranking_date: NaiveDate,
) -> Result<bool, TennisError> {
    let entry: ApiRankingEntry = serde_json::from_value(row.clone())?;
    let athlete = entry.athlete().ok_or_else(|| TennisError::malformed("ranking row without player"))?;
    let rank = entry
        .ranking
        .filter(|r| *r > 0)
        .ok_or_else(|| TennisError::malformed(format!("no rank for {}", athlete.name)))?;
    let points = entry.points.map(|p| p.round() as i32).unwrap_or(0).max(0);

    let mut player = athlete.to_provider_player();
    player.ranking = Some(rank);
    let resolved = resolver.resolve_provider(&player, tour).await?;

    store.update_player_ranking(resolved.id, Some(rank), Some(points)).await?;
    store
        .upsert_ranking_snapshot(&RankingSnapshot {
            player_id: resolved.id,
            ranking_date,
            tour,
            rank,
            points,
            ranking_movement: entry.ranking_movement,
            tournaments_played: entry.tournaments_played,
            raw: Some(row.clone()),
        })
        .await?;

    Ok(resolved.created)
}
