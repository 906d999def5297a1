//! Canonical records shared by every source, the builder and the store

use crate::error::TennisError;
use crate::rounds::{CanonicalRound, RoundVocabulary};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Professional tour a player or match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tour {
    Atp,
    Wta,
}

impl Tour {
    pub const ALL: [Tour; 2] = [Tour::Atp, Tour::Wta];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tour::Atp => "ATP",
            Tour::Wta => "WTA",
        }
    }

    /// Lowercase form used for ranking tables and endpoint paths
    pub fn ranking_type(&self) -> &'static str {
        match self {
            Tour::Atp => "atp",
            Tour::Wta => "wta",
        }
    }

    /// Infer the tour from a free-form category or tournament label.
    ///
    /// Anything mentioning the women's tour is WTA, everything else ATP.
    pub fn from_label(label: &str) -> Tour {
        let label = label.to_lowercase();
        if label.contains("wta") || label.contains("women") {
            Tour::Wta
        } else {
            Tour::Atp
        }
    }
}

impl fmt::Display for Tour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tour {
    type Err = TennisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "atp" => Ok(Tour::Atp),
            "wta" => Ok(Tour::Wta),
            other => Err(TennisError::malformed(format!("unknown tour '{}'", other))),
        }
    }
}

/// Stable identifier of a player row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a tournament row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TournamentId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Completed,
    InProgress,
    Scheduled,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Completed => "completed",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    /// Map the live API's `status.type` field
    pub fn from_provider(status_type: &str) -> MatchStatus {
        match status_type.trim().to_lowercase().as_str() {
            "finished" => MatchStatus::Completed,
            "inprogress" => MatchStatus::InProgress,
            "notstarted" => MatchStatus::Scheduled,
            _ => MatchStatus::Cancelled,
        }
    }
}

impl FromStr for MatchStatus {
    type Err = TennisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(MatchStatus::Completed),
            "in_progress" => Ok(MatchStatus::InProgress),
            "scheduled" => Ok(MatchStatus::Scheduled),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(TennisError::malformed(format!("unknown match status '{}'", other))),
        }
    }
}

/// Player as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub normalized_name: String,
    pub tour: Tour,
    pub rank: Option<i32>,
    pub points: i32,
    pub rolling_points: i32,
    pub country: Option<String>,
    pub provider_id: Option<i64>,
}

/// Player about to be created by the resolver or the rankings sync
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayer {
    pub name: String,
    pub normalized_name: String,
    pub tour: Tour,
    pub rank: i32,
    pub points: i32,
    pub country: Option<String>,
    pub provider_id: Option<i64>,
}

impl NewPlayer {
    /// Provisional row: unknown rank and points fall back to 999 and 0
    pub fn provisional(name: &str, tour: Tour, rank: Option<i32>, points: Option<i32>) -> Self {
        Self {
            name: name.trim().to_string(),
            normalized_name: crate::names::normalize(name),
            tour,
            rank: rank.filter(|r| *r > 0).unwrap_or(crate::DEFAULT_PROVISIONAL_RANK),
            points: points.filter(|p| *p >= 0).unwrap_or(0),
            country: None,
            provider_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub tour: Tour,
    pub stage: String,
}

/// Key under which a match is persisted at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKey {
    /// Unordered player pair plus match date
    PairAndDate { low: PlayerId, high: PlayerId, date: NaiveDate },
    /// Identifier assigned by the live API
    ProviderMatchId(i64),
    /// Unordered player pair within one tournament edition, matched on a date range
    PairInTournament { low: PlayerId, high: PlayerId, tournament: TournamentId, from: NaiveDate, to: NaiveDate },
}

impl MatchKey {
    pub fn pair(a: PlayerId, b: PlayerId, date: NaiveDate) -> Self {
        let (low, high) = ordered(a, b);
        MatchKey::PairAndDate { low, high, date }
    }

    /// Pair key spanning `date ± TOURNAMENT_SPAN_DAYS` inside one tournament
    pub fn pair_in_tournament(a: PlayerId, b: PlayerId, tournament: TournamentId, date: NaiveDate) -> Self {
        let (low, high) = ordered(a, b);
        let span = chrono::Duration::days(crate::TOURNAMENT_SPAN_DAYS);
        MatchKey::PairInTournament { low, high, tournament, from: date - span, to: date + span }
    }

    /// Whether a stored record sits under this key
    pub fn matches(&self, record: &MatchRecord) -> bool {
        let (low, high) = ordered(record.player1.player_id, record.player2.player_id);
        match *self {
            MatchKey::PairAndDate { low: l, high: h, date } => (l, h, date) == (low, high, record.match_date),
            MatchKey::ProviderMatchId(id) => record.provider_match_id == Some(id),
            MatchKey::PairInTournament { low: l, high: h, tournament, from, to } => {
                (l, h) == (low, high)
                    && record.tournament_id == Some(tournament)
                    && (from..=to).contains(&record.match_date)
            }
        }
    }
}

fn ordered(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Which natural key the sync engine uses for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Insert once per unordered pair and date, later sightings are skipped
    #[default]
    PairAndDate,
    /// Replace the whole row keyed on the provider match id
    ProviderMatchId,
    /// Insert once per unordered pair and tournament edition; for sources
    /// whose dates are approximate
    PairInTournament,
}

/// One participant's side of a canonical match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSide {
    pub player_id: PlayerId,
    pub name: String,
    pub ranking_before: Option<i32>,
    pub ranking_points_before: Option<i32>,
    pub points_earned: i32,
}

/// Canonical match record ready to be persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub tournament_name: String,
    pub tournament_id: Option<TournamentId>,
    pub tournament_level: String,
    pub round: CanonicalRound,
    pub surface: Option<String>,
    pub score: Option<String>,
    pub tour: Tour,
    pub match_date: NaiveDate,
    pub player1: MatchSide,
    pub player2: MatchSide,
    pub status: MatchStatus,
    pub provider_match_id: Option<i64>,
    pub raw: Option<serde_json::Value>,
}

impl MatchRecord {
    pub fn natural_key(&self, policy: KeyPolicy) -> Option<MatchKey> {
        match policy {
            KeyPolicy::PairAndDate => Some(MatchKey::pair(
                self.player1.player_id,
                self.player2.player_id,
                self.match_date,
            )),
            KeyPolicy::ProviderMatchId => self.provider_match_id.map(MatchKey::ProviderMatchId),
            KeyPolicy::PairInTournament => self.tournament_id.map(|tournament| {
                MatchKey::pair_in_tournament(self.player1.player_id, self.player2.player_id, tournament, self.match_date)
            }),
        }
    }

    pub fn involves(&self, player: PlayerId) -> bool {
        self.player1.player_id == player || self.player2.player_id == player
    }

    /// The side a player played on, if any
    pub fn side_of(&self, player: PlayerId) -> Option<&MatchSide> {
        if self.player1.player_id == player {
            Some(&self.player1)
        } else if self.player2.player_id == player {
            Some(&self.player2)
        } else {
            None
        }
    }

    pub fn points_for_player(&self, player: PlayerId) -> i32 {
        self.side_of(player).map(|side| side.points_earned).unwrap_or(0)
    }
}

/// Match row with its store-assigned id (monotonic in insertion order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub id: i64,
    pub record: MatchRecord,
}

/// Fantasy roster slot: a player held by a team from `acquisition_date`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonStat {
    pub id: i64,
    pub season: i32,
    pub team_id: i64,
    pub player_id: PlayerId,
    pub acquisition_date: NaiveDate,
    pub release_date: Option<NaiveDate>,
    pub points_earned: i32,
}

/// Dated ranking observation from the rankings API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSnapshot {
    pub player_id: PlayerId,
    pub ranking_date: NaiveDate,
    pub tour: Tour,
    pub rank: i32,
    pub points: i32,
    pub ranking_movement: Option<i32>,
    pub tournaments_played: Option<i32>,
    pub raw: Option<serde_json::Value>,
}

/// Payload family an event was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSchema {
    LiveEvents,
    TabularResults,
    ScrapedResults,
}

impl SourceSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSchema::LiveEvents => "live_events",
            SourceSchema::TabularResults => "tabular_results",
            SourceSchema::ScrapedResults => "scraped_results",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player1,
    Player2,
}

/// Round label together with the vocabulary it is spelled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundLabel {
    pub label: String,
    pub vocabulary: RoundVocabulary,
}

impl RoundLabel {
    pub fn text(label: impl Into<String>) -> Self {
        Self { label: label.into(), vocabulary: RoundVocabulary::Text }
    }
}

/// Player as the live API describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPlayer {
    pub id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub gender: Option<String>,
    pub ranking: Option<i32>,
}

/// Participant reference as found in a source event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participant {
    /// Identified by display name only; rank and points observed before the match
    Named { name: String, rank: Option<i32>, points: Option<i32> },
    /// Identified by the provider's player id
    Provider(ProviderPlayer),
}

impl Participant {
    pub fn named(name: impl Into<String>) -> Self {
        Participant::Named { name: name.into(), rank: None, points: None }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Participant::Named { name, .. } => name,
            Participant::Provider(player) => &player.name,
        }
    }

    pub fn observed_rank(&self) -> Option<i32> {
        match self {
            Participant::Named { rank, .. } => *rank,
            Participant::Provider(player) => player.ranking,
        }
    }

    pub fn observed_points(&self) -> Option<i32> {
        match self {
            Participant::Named { points, .. } => *points,
            Participant::Provider(_) => None,
        }
    }
}

/// Category metadata the live API attaches to an event, used by the inclusion filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventClassification {
    pub category_name: String,
    pub category_slug: String,
    pub tournament_name: String,
    pub season_name: String,
    pub filter_categories: Vec<String>,
}

/// A single raw event, decoded once at the source boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEvent {
    pub schema: SourceSchema,
    pub tour: Tour,
    pub tournament_name: Option<String>,
    pub tournament_level: Option<String>,
    /// Match date as the source printed it
    pub date: Option<String>,
    pub round: Option<RoundLabel>,
    pub player1: Option<Participant>,
    pub player2: Option<Participant>,
    pub winner: Option<Side>,
    pub score: Option<String>,
    pub surface: Option<String>,
    pub status: MatchStatus,
    pub provider_match_id: Option<i64>,
    pub classification: Option<EventClassification>,
    /// Unmodified source payload
    pub raw: serde_json::Value,
}

impl SourceEvent {
    /// Empty event of the given schema; sources fill in what they have
    pub fn new(schema: SourceSchema, tour: Tour, raw: serde_json::Value) -> Self {
        Self {
            schema,
            tour,
            tournament_name: None,
            tournament_level: None,
            date: None,
            round: None,
            player1: None,
            player2: None,
            winner: None,
            score: None,
            surface: None,
            status: MatchStatus::Completed,
            provider_match_id: None,
            classification: None,
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_order_independent() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 29).unwrap();
        assert_eq!(
            MatchKey::pair(PlayerId(7), PlayerId(3), date),
            MatchKey::pair(PlayerId(3), PlayerId(7), date)
        );
        assert_ne!(
            MatchKey::pair(PlayerId(3), PlayerId(7), date),
            MatchKey::pair(PlayerId(3), PlayerId(7), date.succ_opt().unwrap())
        );
    }

    #[test]
    fn test_tournament_key_spans_the_edition() {
        let side = |id: i64| MatchSide {
            player_id: PlayerId(id),
            name: format!("p{}", id),
            ranking_before: None,
            ranking_points_before: None,
            points_earned: 0,
        };
        let stored = MatchRecord {
            tournament_name: "Qatar Open".to_string(),
            tournament_id: Some(TournamentId(5)),
            tournament_level: "WTA 1000".to_string(),
            round: crate::CanonicalRound::Final,
            surface: None,
            score: None,
            tour: Tour::Wta,
            match_date: NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            player1: side(1),
            player2: side(2),
            status: MatchStatus::Completed,
            provider_match_id: None,
            raw: None,
        };

        let next_day = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
        assert!(MatchKey::pair_in_tournament(PlayerId(2), PlayerId(1), TournamentId(5), next_day).matches(&stored));
        assert!(!MatchKey::pair_in_tournament(PlayerId(1), PlayerId(2), TournamentId(6), next_day).matches(&stored));

        let next_year = NaiveDate::from_ymd_opt(2027, 2, 14).unwrap();
        assert!(!MatchKey::pair_in_tournament(PlayerId(1), PlayerId(2), TournamentId(5), next_year).matches(&stored));
        assert!(!MatchKey::pair(PlayerId(1), PlayerId(2), next_day).matches(&stored));

        let mut untracked = stored.clone();
        untracked.tournament_id = None;
        assert_eq!(untracked.natural_key(KeyPolicy::PairInTournament), None);
    }

    #[test]
    fn test_tour_parsing() {
        assert_eq!("atp".parse::<Tour>().unwrap(), Tour::Atp);
        assert_eq!(" WTA ".parse::<Tour>().unwrap(), Tour::Wta);
        assert!("itf".parse::<Tour>().is_err());
        assert_eq!(Tour::from_label("Women's Singles"), Tour::Wta);
        assert_eq!(Tour::from_label("Challenger"), Tour::Atp);
    }

    #[test]
    fn test_provider_status() {
        assert_eq!(MatchStatus::from_provider("finished"), MatchStatus::Completed);
        assert_eq!(MatchStatus::from_provider("inprogress"), MatchStatus::InProgress);
        assert_eq!(MatchStatus::from_provider("notstarted"), MatchStatus::Scheduled);
        assert_eq!(MatchStatus::from_provider("canceled"), MatchStatus::Cancelled);
        assert_eq!("in_progress".parse::<MatchStatus>().unwrap(), MatchStatus::InProgress);
    }

    #[test]
    fn test_provisional_player_defaults() {
        let player = NewPlayer::provisional(" Jakub Menšík ", Tour::Atp, None, None);
        assert_eq!(player.name, "Jakub Menšík");
        assert_eq!(player.normalized_name, "jakub mensik");
        assert_eq!(player.rank, 999);
        assert_eq!(player.points, 0);

        let ranked = NewPlayer::provisional("Jakub Mensik", Tour::Atp, Some(24), Some(1800));
        assert_eq!((ranked.rank, ranked.points), (24, 1800));
    }
}
