use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tennis_core::{
    level_from_tournament_name, MatchStatus, Participant, RoundLabel, Side, SourceEvent, SourceSchema, Tour,
};

/// One completed match read off a results page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedMatch {
    pub tour: Tour,
    /// Tournament title (e.g., "Australian Open")
    pub tournament_name: String,
    /// Tier inferred from the tournament name (e.g., "ATP 500")
    pub tournament_level: String,
    /// Date text as printed on the page
    pub date: Option<String>,
    /// Round label as printed (e.g., "Quarterfinals")
    pub round: Option<String>,
    /// Listed first; results pages list the winner first
    pub winner_name: String,
    pub loser_name: String,
    pub score: Option<String>,
    pub surface: Option<String>,
}

impl ScrapedMatch {
    pub fn new(tour: Tour, tournament_name: &str, winner_name: &str, loser_name: &str) -> Self {
        Self {
            tour,
            tournament_name: tournament_name.to_string(),
            tournament_level: level_from_tournament_name(tournament_name, tour).to_string(),
            date: None,
            round: None,
            winner_name: winner_name.to_string(),
            loser_name: loser_name.to_string(),
            score: None,
            surface: None,
        }
    }

    /// Convert to the canonical input of the match builder
    pub fn into_source_event(self) -> SourceEvent {
        let raw = serde_json::to_value(&self).unwrap_or(serde_json::Value::Null);
        let mut event = SourceEvent::new(SourceSchema::ScrapedResults, self.tour, raw);
        event.tournament_name = Some(self.tournament_name);
        event.tournament_level = Some(self.tournament_level);
        event.date = self.date;
        event.round = self.round.map(RoundLabel::text);
        event.player1 = Some(Participant::named(self.winner_name));
        event.player2 = Some(Participant::named(self.loser_name));
        event.winner = Some(Side::Player1);
        event.score = self.score.filter(|s| !s.is_empty());
        event.surface = self.surface;
        event.status = MatchStatus::Completed;
        event
    }
}

/// Container for one scrape of one tour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedResults {
    pub tour: Tour,
    /// When this page was scraped
    pub scraped_at: DateTime<Utc>,
    pub matches: Vec<ScrapedMatch>,
}

impl ScrapedResults {
    pub fn new(tour: Tour) -> Self {
        Self { tour, scraped_at: Utc::now(), matches: Vec::new() }
    }

    pub fn into_source_events(self) -> Vec<SourceEvent> {
        self.matches.into_iter().map(ScrapedMatch::into_source_event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_is_player_one() {
        let mut scraped = ScrapedMatch::new(Tour::Atp, "Wimbledon", "Jannik Sinner", "Carlos Alcaraz");
        scraped.round = Some("Final".to_string());
        scraped.date = Some("2026.07.12".to_string());

        let event = scraped.into_source_event();
        assert_eq!(event.schema, SourceSchema::ScrapedResults);
        assert_eq!(event.tournament_level.as_deref(), Some("Grand Slam"));
        assert_eq!(event.winner, Some(Side::Player1));
        assert_eq!(event.player1.as_ref().map(|p| p.display_name()), Some("Jannik Sinner"));
        assert_eq!(event.raw["winner_name"], "Jannik Sinner");
    }
}
