use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tennis_core::{
    EventClassification, MatchStatus, Participant, ProviderPlayer, RoundLabel, RoundVocabulary, Side,
    SourceEvent, SourceSchema, Tour,
};
use tracing::warn;

/// Live API event, decoded from one element of `events`
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: i64,

    pub tournament: ApiTournament,

    #[serde(default)]
    pub season: Option<ApiSeason>,

    #[serde(default)]
    pub round_info: Option<ApiRoundInfo>,

    #[serde(default)]
    pub home_team: Option<ApiTeam>,

    #[serde(default)]
    pub away_team: Option<ApiTeam>,

    #[serde(default)]
    pub home_score: Option<ApiScore>,

    #[serde(default)]
    pub away_score: Option<ApiScore>,

    #[serde(default)]
    pub status: Option<ApiStatus>,

    /// 1 = home won, 2 = away won
    #[serde(default)]
    pub winner_code: Option<i32>,

    #[serde(default)]
    pub ground_type: Option<String>,

    /// Unix seconds
    #[serde(default)]
    pub start_timestamp: Option<i64>,

    #[serde(default)]
    pub event_filters: Option<ApiEventFilters>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiTournament {
    pub name: String,

    #[serde(default)]
    pub category: Option<ApiCategory>,

    #[serde(default)]
    pub unique_tournament: Option<ApiUniqueTournament>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiCategory {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiUniqueTournament {
    #[serde(default)]
    pub name: Option<String>,

    /// Ranking points of the title, e.g. 2000 for a slam; number or string
    #[serde(default)]
    pub tennis_points: Option<Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiSeason {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub year: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiRoundInfo {
    #[serde(default)]
    pub round: Option<i32>,

    #[serde(default)]
    pub name: Option<String>,

    /// Matches played in the round: 1 = final, 2 = semi-finals, ...
    #[serde(default)]
    pub cup_round_type: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiCountry {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub alpha2: Option<String>,
}

/// Player ("team" in the provider's vocabulary)
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiTeam {
    pub id: i64,

    pub name: String,

    #[serde(default)]
    pub short_name: Option<String>,

    #[serde(default)]
    pub country: Option<ApiCountry>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub ranking: Option<i32>,
}

impl ApiTeam {
    pub fn to_provider_player(&self) -> ProviderPlayer {
        ProviderPlayer {
            id: self.id,
            name: self.name.trim().to_string(),
            short_name: self.short_name.clone(),
            country: self.country.as_ref().and_then(|c| c.name.clone()),
            country_code: self.country.as_ref().and_then(|c| c.alpha2.clone()),
            gender: self.gender.clone(),
            ranking: self.ranking.filter(|r| *r > 0),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiScore {
    #[serde(default)]
    pub period1: Option<i32>,
    #[serde(default)]
    pub period2: Option<i32>,
    #[serde(default)]
    pub period3: Option<i32>,
    #[serde(default)]
    pub period4: Option<i32>,
    #[serde(default)]
    pub period5: Option<i32>,
}

impl ApiScore {
    fn sets(&self) -> [Option<i32>; 5] {
        [self.period1, self.period2, self.period3, self.period4, self.period5]
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiStatus {
    #[serde(rename = "type", default)]
    pub status_type: String,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiEventFilters {
    #[serde(default)]
    pub category: Vec<String>,

    #[serde(default)]
    pub gender: Vec<String>,
}

/// Set scores as "6-3, 7-6"; sets missing on either side are skipped
pub fn format_score(home: Option<&ApiScore>, away: Option<&ApiScore>) -> Option<String> {
    let (home, away) = (home?, away?);
    let sets: Vec<String> = home
        .sets()
        .iter()
        .zip(away.sets().iter())
        .filter_map(|(h, a)| Some(format!("{}-{}", (*h)?, (*a)?)))
        .collect();
    (!sets.is_empty()).then(|| sets.join(", "))
}

fn value_label(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

impl ApiEvent {
    /// Tour from the category, falling back to the gender filter
    pub fn tour(&self) -> Tour {
        let category = self.tournament.category.clone().unwrap_or_default();
        if Tour::from_label(&category.slug) == Tour::Wta || Tour::from_label(&category.name) == Tour::Wta {
            return Tour::Wta;
        }
        let female = self
            .event_filters
            .as_ref()
            .map(|f| f.gender.iter().any(|g| g.eq_ignore_ascii_case("f") || g.eq_ignore_ascii_case("women")))
            .unwrap_or(false);
        if female {
            Tour::Wta
        } else {
            Tour::Atp
        }
    }

    pub fn match_date(&self) -> Option<NaiveDate> {
        self.start_timestamp
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive())
    }

    fn round_label(&self) -> Option<RoundLabel> {
        let info = self.round_info.as_ref()?;
        if let Some(cup) = info.cup_round_type {
            return Some(RoundLabel { label: cup.to_string(), vocabulary: RoundVocabulary::CupRoundType });
        }
        info.name.as_ref().map(|name| RoundLabel::text(name.clone()))
    }

    fn classification(&self) -> EventClassification {
        let category = self.tournament.category.clone().unwrap_or_default();
        EventClassification {
            category_name: category.name,
            category_slug: category.slug,
            tournament_name: self.tournament.name.clone(),
            season_name: self.season.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            filter_categories: self.event_filters.as_ref().map(|f| f.category.clone()).unwrap_or_default(),
        }
    }

    fn status(&self) -> MatchStatus {
        match &self.status {
            Some(status) => MatchStatus::from_provider(&status.status_type),
            None if self.winner_code.is_some() => MatchStatus::Completed,
            None => MatchStatus::Scheduled,
        }
    }

    /// Convert to the canonical input of the match builder; `raw` is the unmodified element
    pub fn into_source_event(self, raw: Value) -> SourceEvent {
        let mut event = SourceEvent::new(SourceSchema::LiveEvents, self.tour(), raw);
        event.tournament_name = Some(
            self.tournament
                .unique_tournament
                .as_ref()
                .and_then(|u| u.name.clone())
                .unwrap_or_else(|| self.tournament.name.clone()),
        );
        event.tournament_level = self
            .tournament
            .unique_tournament
            .as_ref()
            .and_then(|u| u.tennis_points.as_ref())
            .and_then(value_label);
        event.date = self.match_date().map(|d| d.format("%Y-%m-%d").to_string());
        event.round = self.round_label();
        event.player1 = self.home_team.as_ref().map(|t| Participant::Provider(t.to_provider_player()));
        event.player2 = self.away_team.as_ref().map(|t| Participant::Provider(t.to_provider_player()));
        event.winner = match self.winner_code {
            Some(1) => Some(Side::Player1),
            Some(2) => Some(Side::Player2),
            _ => None,
        };
        event.score = format_score(self.home_score.as_ref(), self.away_score.as_ref());
        event.surface = self.ground_type.clone();
        event.status = self.status();
        event.provider_match_id = Some(self.id);
        event.classification = Some(self.classification());
        event
    }
}

/// Decode the `events` array of a live payload.
///
/// Elements that do not decode are counted and skipped.
pub fn decode_events(payload: &Value) -> (Vec<SourceEvent>, usize) {
    let Some(items) = payload.get("events").and_then(Value::as_array) else {
        return (Vec::new(), 0);
    };

    let mut events = Vec::with_capacity(items.len());
    let mut malformed = 0;
    for item in items {
        match serde_json::from_value::<ApiEvent>(item.clone()) {
            Ok(event) => events.push(event.into_source_event(item.clone())),
            Err(e) => {
                malformed += 1;
                warn!("Skipping malformed event {}: {}", item.get("id").unwrap_or(&serde_json::Value::Null), e);
            }
        }
    }
    (events, malformed)
}

/// One row of the rankings table
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApiRankingEntry {
    #[serde(default)]
    pub team: Option<ApiTeam>,

    #[serde(default)]
    pub player: Option<ApiTeam>,

    #[serde(default)]
    pub ranking: Option<i32>,

    #[serde(default)]
    pub points: Option<f64>,

    #[serde(default)]
    pub ranking_movement: Option<i32>,

    #[serde(default)]
    pub tournaments_played: Option<i32>,
}

impl ApiRankingEntry {
    pub fn athlete(&self) -> Option<&ApiTeam> {
        self.team.as_ref().or(self.player.as_ref())
    }
}

/// Events emitted by a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FetcherEvent {
    MatchesSynced {
        source: String,
        inserted: usize,
        updated: usize,
        skipped: usize,
        rejected: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },
    RankingsSynced {
        tour: Tour,
        count: usize,
        timestamp: DateTime<Utc>,
    },
    FetchFailed {
        endpoint: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    DumpWritten {
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event() -> Value {
        json!({
            "id": 11998877,
            "tournament": {
                "name": "Miami, USA",
                "category": {"name": "ATP", "slug": "atp"},
                "uniqueTournament": {"name": "Miami", "tennisPoints": 1000}
            },
            "season": {"name": "ATP Miami 2026", "year": "2026"},
            "roundInfo": {"round": 29, "name": "Final", "cupRoundType": 1},
            "homeTeam": {"id": 206570, "name": "Sinner J.", "country": {"name": "Italy", "alpha2": "IT"}, "ranking": 1},
            "awayTeam": {"id": 275923, "name": "Alcaraz C.", "ranking": 2},
            "homeScore": {"current": 2, "period1": 7, "period2": 6},
            "awayScore": {"current": 0, "period1": 6, "period2": 4},
            "status": {"code": 100, "type": "finished"},
            "winnerCode": 1,
            "groundType": "Hardcourt outdoor",
            "startTimestamp": 1774800000,
            "eventFilters": {"category": ["singles"], "gender": ["M"]}
        })
    }

    #[test]
    fn test_event_to_source_event() {
        let (events, malformed) = decode_events(&json!({ "events": [sample_event()] }));
        assert_eq!(malformed, 0);

        let event = &events[0];
        assert_eq!(event.schema, SourceSchema::LiveEvents);
        assert_eq!(event.tour, Tour::Atp);
        assert_eq!(event.tournament_name.as_deref(), Some("Miami"));
        assert_eq!(event.tournament_level.as_deref(), Some("1000"));
        assert_eq!(event.date.as_deref(), Some("2026-03-29"));
        assert_eq!(
            event.round,
            Some(RoundLabel { label: "1".to_string(), vocabulary: RoundVocabulary::CupRoundType })
        );
        assert_eq!(event.winner, Some(Side::Player1));
        assert_eq!(event.score.as_deref(), Some("7-6, 6-4"));
        assert_eq!(event.status, MatchStatus::Completed);
        assert_eq!(event.provider_match_id, Some(11998877));
        assert_eq!(event.raw["id"], 11998877);

        match &event.player1 {
            Some(Participant::Provider(player)) => {
                assert_eq!(player.id, 206570);
                assert_eq!(player.country_code.as_deref(), Some("IT"));
            }
            other => panic!("unexpected participant {:?}", other),
        }
        let classification = event.classification.as_ref().unwrap();
        assert_eq!(classification.filter_categories, vec!["singles".to_string()]);
    }

    #[test]
    fn test_round_name_used_without_cup_round_type() {
        let mut raw = sample_event();
        raw["roundInfo"] = json!({"round": 5, "name": "Quarterfinals"});
        raw["tournament"]["category"] = json!({"name": "WTA", "slug": "wta"});
        raw["winnerCode"] = json!(2);

        let (events, _) = decode_events(&json!({ "events": [raw] }));
        assert_eq!(events[0].tour, Tour::Wta);
        assert_eq!(events[0].round, Some(RoundLabel::text("Quarterfinals")));
        assert_eq!(events[0].winner, Some(Side::Player2));
    }

    #[test]
    fn test_malformed_events_are_counted() {
        let payload = json!({ "events": [sample_event(), {"id": "not a number"}, {"tournament": {}}] });
        let (events, malformed) = decode_events(&payload);
        assert_eq!(events.len(), 1);
        assert_eq!(malformed, 2);

        assert_eq!(decode_events(&json!({"error": "quota"})), (Vec::new(), 0));
    }

    #[test]
    fn test_format_score() {
        let home = ApiScore { period1: Some(6), period2: Some(3), period3: Some(7), ..Default::default() };
        let away = ApiScore { period1: Some(4), period2: Some(6), ..Default::default() };
        assert_eq!(format_score(Some(&home), Some(&away)).as_deref(), Some("6-4, 3-6"));
        assert_eq!(format_score(Some(&home), None), None);
        assert_eq!(format_score(Some(&ApiScore::default()), Some(&ApiScore::default())), None);
    }

    #[test]
    fn test_unfinished_event_has_no_winner() {
        let mut raw = sample_event();
        raw["status"] = json!({"type": "notstarted"});
        raw.as_object_mut().unwrap().remove("winnerCode");

        let (events, _) = decode_events(&json!({ "events": [raw] }));
        assert_eq!(events[0].status, MatchStatus::Scheduled);
        assert_eq!(events[0].winner, None);
    }

    #[test]
    fn test_ranking_entry_athlete() {
        let entry: ApiRankingEntry = serde_json::from_value(json!({
            "team": {"id": 206570, "name": "Jannik Sinner"},
            "ranking": 1,
            "points": 11830,
            "rankingMovement": 0
        }))
        .unwrap();
        assert_eq!(entry.athlete().map(|t| t.id), Some(206570));
        assert_eq!(entry.points, Some(11830.0));
    }
}
