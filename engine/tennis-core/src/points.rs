//! Ranking points awarded per tournament level and round

use crate::rounds::CanonicalRound;
use crate::types::Tour;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tournament tier that drives the points table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TournamentLevel {
    GrandSlam,
    Masters1000,
    Atp500,
    Atp250,
    Wta1000,
    Wta500,
    Wta250,
}

impl TournamentLevel {
    /// Resolve a free-form level label for the given tour.
    ///
    /// Bare tier numbers resolve by tour; anything unrecognized is the tour's 250 tier.
    pub fn from_label(label: &str, tour: Tour) -> TournamentLevel {
        let compact: String = label
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect();

        match compact.as_str() {
            "grandslam" | "gs" | "slam" | "2000" => TournamentLevel::GrandSlam,
            "masters1000" | "atpmasters1000" | "masters" | "mastersseries" | "masterscup" => {
                TournamentLevel::Masters1000
            }
            "atp500" | "internationalgold" => TournamentLevel::Atp500,
            "atp250" => TournamentLevel::Atp250,
            "wta1000" | "premiermandatory" => TournamentLevel::Wta1000,
            "wta500" | "premier5" | "premier" => TournamentLevel::Wta500,
            "wta250" => TournamentLevel::Wta250,
            "1000" => Self::tier_1000(tour),
            "500" => Self::tier_500(tour),
            _ => Self::tier_250(tour),
        }
    }

    /// The tour's 1000 tier (Masters on the ATP side)
    pub fn tier_1000(tour: Tour) -> TournamentLevel {
        match tour {
            Tour::Atp => TournamentLevel::Masters1000,
            Tour::Wta => TournamentLevel::Wta1000,
        }
    }

    pub fn tier_500(tour: Tour) -> TournamentLevel {
        match tour {
            Tour::Atp => TournamentLevel::Atp500,
            Tour::Wta => TournamentLevel::Wta500,
        }
    }

    pub fn tier_250(tour: Tour) -> TournamentLevel {
        match tour {
            Tour::Atp => TournamentLevel::Atp250,
            Tour::Wta => TournamentLevel::Wta250,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentLevel::GrandSlam => "Grand Slam",
            TournamentLevel::Masters1000 => "ATP Masters 1000",
            TournamentLevel::Atp500 => "ATP 500",
            TournamentLevel::Atp250 => "ATP 250",
            TournamentLevel::Wta1000 => "WTA 1000",
            TournamentLevel::Wta500 => "WTA 500",
            TournamentLevel::Wta250 => "WTA 250",
        }
    }

    /// Whether the level is played on the given tour
    pub fn applies_to(&self, tour: Tour) -> bool {
        match self {
            TournamentLevel::GrandSlam => true,
            TournamentLevel::Masters1000 | TournamentLevel::Atp500 | TournamentLevel::Atp250 => {
                tour == Tour::Atp
            }
            TournamentLevel::Wta1000 | TournamentLevel::Wta500 | TournamentLevel::Wta250 => {
                tour == Tour::Wta
            }
        }
    }

    /// (winner, loser) points per round, Final first
    fn table(&self) -> &'static [(CanonicalRound, i32, i32)] {
        use CanonicalRound::*;
        match self {
            TournamentLevel::GrandSlam => &[
                (Final, 2000, 1200),
                (SemiFinal, 720, 360),
                (QuarterFinal, 360, 180),
                (R16, 180, 90),
                (R32, 90, 45),
                (R64, 45, 10),
                (R128, 10, 0),
            ],
            TournamentLevel::Masters1000 | TournamentLevel::Wta1000 => &[
                (Final, 1000, 600),
                (SemiFinal, 360, 180),
                (QuarterFinal, 180, 90),
                (R16, 90, 45),
                (R32, 45, 25),
                (R64, 25, 10),
            ],
            TournamentLevel::Atp500 | TournamentLevel::Wta500 => &[
                (Final, 500, 300),
                (SemiFinal, 180, 90),
                (QuarterFinal, 90, 45),
                (R16, 45, 20),
            ],
            TournamentLevel::Atp250 | TournamentLevel::Wta250 => &[
                (Final, 250, 150),
                (SemiFinal, 90, 45),
                (QuarterFinal, 45, 20),
                (R16, 20, 0),
            ],
        }
    }
}

impl fmt::Display for TournamentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single points table used by every source
pub struct PointsPolicy;

impl PointsPolicy {
    /// Points for the winner and the loser of a match.
    ///
    /// `(0, 0)` when the round is not in the level's table or the level is not
    /// played on the tour.
    pub fn points_for(level_label: &str, round: CanonicalRound, tour: Tour) -> (i32, i32) {
        Self::points_for_level(TournamentLevel::from_label(level_label, tour), round, tour)
    }

    pub fn points_for_level(level: TournamentLevel, round: CanonicalRound, tour: Tour) -> (i32, i32) {
        if !level.applies_to(tour) {
            return (0, 0);
        }
        level
            .table()
            .iter()
            .find(|(r, _, _)| *r == round)
            .map(|(_, winner, loser)| (*winner, *loser))
            .unwrap_or((0, 0))
    }
}

const GRAND_SLAMS: [&str; 5] = ["australian open", "french open", "roland garros", "wimbledon", "us open"];

const ATP_1000_EVENTS: [&str; 10] = [
    "indian wells",
    "miami",
    "monte carlo",
    "madrid",
    "rome",
    "canada",
    "cincinnati",
    "shanghai",
    "paris",
    "masters 1000",
];

const WTA_1000_EVENTS: [&str; 11] = [
    "doha",
    "dubai",
    "indian wells",
    "miami",
    "madrid",
    "rome",
    "canada",
    "cincinnati",
    "wuhan",
    "beijing",
    "wta 1000",
];

const ATP_500_EVENTS: [&str; 10] = [
    "rotterdam",
    "dubai",
    "barcelona",
    "queens",
    "halle",
    "washington",
    "beijing",
    "tokyo",
    "basel",
    "vienna",
];

const WTA_500_EVENTS: [&str; 9] = [
    "adelaide",
    "dubai",
    "charleston",
    "stuttgart",
    "berlin",
    "eastbourne",
    "san diego",
    "tokyo",
    "zhengzhou",
];

/// Classify a tournament by its name when the source gives no tier.
pub fn level_from_tournament_name(name: &str, tour: Tour) -> TournamentLevel {
    let name = name.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| name.contains(k));

    if mentions(&GRAND_SLAMS) {
        return TournamentLevel::GrandSlam;
    }
    let (thousands, five_hundreds): (&[&str], &[&str]) = match tour {
        Tour::Atp => (&ATP_1000_EVENTS[..], &ATP_500_EVENTS[..]),
        Tour::Wta => (&WTA_1000_EVENTS[..], &WTA_500_EVENTS[..]),
    };
    if mentions(thousands) {
        TournamentLevel::tier_1000(tour)
    } else if name.contains("500") || mentions(five_hundreds) {
        TournamentLevel::tier_500(tour)
    } else {
        TournamentLevel::tier_250(tour)
    }
}
