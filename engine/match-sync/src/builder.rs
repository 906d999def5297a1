//! Turns one decoded source event into a canonical [`MatchRecord`]

use crate::filter::{self, FilterReason};
use chrono::{NaiveDate, NaiveDateTime};
use player_registry::PlayerResolver;
use serde::{Deserialize, Serialize};
use tennis_core::{
    level_from_tournament_name, CanonicalRound, MatchRecord, MatchSide, Participant, PointsPolicy,
    RoundMapper, Side, SourceEvent, SourceSchema, TennisError,
};
use thiserror::Error;
use tracing::debug;

/// What to do with an event whose round cannot be mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownRoundPolicy {
    /// Keep the match; both players earn nothing
    #[default]
    ZeroPoints,
    Reject,
}

/// Why an event did not become a match record
#[derive(Error, Debug)]
pub enum Rejection {
    #[error("filtered out: {0}")]
    FilteredOut(FilterReason),

    #[error("missing {0:?}")]
    MissingParticipant(Side),

    #[error("could not resolve participant '{0}'")]
    UnresolvedParticipant(String),

    #[error("unparsable match date '{0}'")]
    BadDate(String),

    #[error("unknown round '{0}'")]
    UnknownRound(String),

    #[error("resolver error: {0}")]
    Resolver(#[from] TennisError),
}

impl Rejection {
    /// Resolver errors are failures of the run, the rest are properties of the event
    pub fn is_failure(&self) -> bool {
        matches!(self, Rejection::Resolver(_))
    }
}

const DATE_FORMATS: [&str; 6] = ["%Y-%m-%d", "%Y.%m.%d", "%m/%d/%Y", "%d.%m.%Y", "%B %d, %Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a match date in any of the formats the sources print
pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| chrono::DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[derive(Debug, Clone, Default)]
pub struct MatchRecordBuilder {
    unknown_round: UnknownRoundPolicy,
}

impl MatchRecordBuilder {
    pub fn new(unknown_round: UnknownRoundPolicy) -> Self {
        Self { unknown_round }
    }

    /// Build a match record, resolving both participants through `resolver`.
    ///
    /// The inclusion filter only applies to live API events. Participants are
    /// resolved after every cheap check so that rejected events never create
    /// players.
    pub async fn build<R: PlayerResolver + ?Sized>(
        &self,
        event: &SourceEvent,
        resolver: &mut R,
    ) -> Result<MatchRecord, Rejection> {
        if event.schema == SourceSchema::LiveEvents {
            if let Some(classification) = &event.classification {
                filter::check(classification).map_err(Rejection::FilteredOut)?;
            }
        }

        let raw_date = event.date.clone().unwrap_or_default();
        let match_date = parse_match_date(&raw_date).ok_or(Rejection::BadDate(raw_date))?;

        let round = event
            .round
            .as_ref()
            .map(|r| RoundMapper::canonicalize(&r.label, r.vocabulary))
            .unwrap_or(CanonicalRound::Unknown);
        if round == CanonicalRound::Unknown && self.unknown_round == UnknownRoundPolicy::Reject {
            let label = event.round.as_ref().map(|r| r.label.clone()).unwrap_or_default();
            return Err(Rejection::UnknownRound(label));
        }

        let first = event.player1.as_ref().ok_or(Rejection::MissingParticipant(Side::Player1))?;
        let second = event.player2.as_ref().ok_or(Rejection::MissingParticipant(Side::Player2))?;

        let tournament_name = event
            .tournament_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown Tournament")
            .to_string();
        let tournament_level = event
            .tournament_level
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| level_from_tournament_name(&tournament_name, event.tour).to_string());

        let (winner_points, loser_points) = match event.winner {
            Some(_) => PointsPolicy::points_for(&tournament_level, round, event.tour),
            None => (0, 0),
        };
        let (p1_points, p2_points) = match event.winner {
            Some(Side::Player1) => (winner_points, loser_points),
            Some(Side::Player2) => (loser_points, winner_points),
            None => (0, 0),
        };

        let player1 = self.resolve_side(first, event, &mut *resolver, p1_points).await?;
        let player2 = self.resolve_side(second, event, resolver, p2_points).await?;

        debug!(
            "Built {} {} match {} vs {} on {} ({} / {})",
            event.tour, round, player1.name, player2.name, match_date, p1_points, p2_points
        );

        Ok(MatchRecord {
            tournament_name,
            tournament_id: None,
            tournament_level,
            round,
            surface: event.surface.clone(),
            score: event.score.clone(),
            tour: event.tour,
            match_date,
            player1,
            player2,
            status: event.status,
            provider_match_id: event.provider_match_id,
            raw: Some(event.raw.clone()),
        })
    }

    async fn resolve_side<R: PlayerResolver + ?Sized>(
        &self,
        participant: &Participant,
        event: &SourceEvent,
        resolver: &mut R,
        points_earned: i32,
    ) -> Result<MatchSide, Rejection> {
        let player_id = match participant {
            Participant::Named { name, rank, points } => resolver
                .resolve(name, event.tour, *rank, *points)
                .await?
                .ok_or_else(|| Rejection::UnresolvedParticipant(name.clone()))?
                .id,
            Participant::Provider(player) => resolver.resolve_provider(player, event.tour).await?.id,
        };

        Ok(MatchSide {
            player_id,
            name: participant.display_name().trim().to_string(),
            ranking_before: participant.observed_rank().filter(|r| *r > 0),
            ranking_points_before: participant.observed_points().filter(|p| *p >= 0),
            points_earned,
        })
    }
}
