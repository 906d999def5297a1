//! Round name canonicalization across source vocabularies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stage of a tournament, independent of how a source spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalRound {
    Final,
    SemiFinal,
    QuarterFinal,
    R16,
    R32,
    R64,
    R128,
    Unknown,
}

impl CanonicalRound {
    /// Label stored in the `round` column
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalRound::Final => "Final",
            CanonicalRound::SemiFinal => "Semi-Final",
            CanonicalRound::QuarterFinal => "Quarter-Final",
            CanonicalRound::R16 => "Round of 16",
            CanonicalRound::R32 => "Round of 32",
            CanonicalRound::R64 => "Round of 64",
            CanonicalRound::R128 => "Round of 128",
            CanonicalRound::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, CanonicalRound::Unknown)
    }
}

impl fmt::Display for CanonicalRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalRound {
    type Err = std::convert::Infallible;

    /// Reads back a stored label; anything else goes through the text vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RoundMapper::canonicalize(s, RoundVocabulary::Text))
    }
}

/// How a source spells its rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundVocabulary {
    /// Free text: "The Final", "Semi-Finals", "QF", "Round of 32", "2nd Round"
    Text,
    /// Live-score numeric index: the number of matches played in the round
    CupRoundType,
}

/// Maps heterogeneous round labels to [`CanonicalRound`].
///
/// Total: every input maps to a variant, unmapped labels to `Unknown`.
pub struct RoundMapper;

impl RoundMapper {
    pub fn canonicalize(label: &str, vocabulary: RoundVocabulary) -> CanonicalRound {
        match vocabulary {
            RoundVocabulary::Text => Self::from_text(label),
            RoundVocabulary::CupRoundType => label
                .trim()
                .parse::<u32>()
                .map(Self::from_cup_round_type)
                .unwrap_or(CanonicalRound::Unknown),
        }
    }

    fn from_cup_round_type(matches_in_round: u32) -> CanonicalRound {
        match matches_in_round {
            1 => CanonicalRound::Final,
            2 => CanonicalRound::SemiFinal,
            4 => CanonicalRound::QuarterFinal,
            8 => CanonicalRound::R16,
            16 => CanonicalRound::R32,
            32 => CanonicalRound::R64,
            64 => CanonicalRound::R128,
            _ => CanonicalRound::Unknown,
        }
    }

    fn from_text(label: &str) -> CanonicalRound {
        let label = label.trim().to_lowercase();
        if label.is_empty() || label.contains("qualif") {
            return CanonicalRound::Unknown;
        }

        // "semi-final" and "quarter-final" both contain "final"
        if label.contains("semi") || label == "sf" {
            return CanonicalRound::SemiFinal;
        }
        if label.contains("quarter") || label == "qf" {
            return CanonicalRound::QuarterFinal;
        }

        // "1/8-finals" style labels
        for (fraction, round) in [
            ("1/16", CanonicalRound::R32),
            ("1/32", CanonicalRound::R64),
            ("1/64", CanonicalRound::R128),
            ("1/8", CanonicalRound::R16),
        ] {
            if label.contains(fraction) {
                return round;
            }
        }

        if label.contains("final") || label == "f" {
            return CanonicalRound::Final;
        }

        for (digits, round) in [
            ("128", CanonicalRound::R128),
            ("64", CanonicalRound::R64),
            ("32", CanonicalRound::R32),
            ("16", CanonicalRound::R16),
        ] {
            if label.contains(digits) {
                return round;
            }
        }

        for (ordinal, round) in [
            ("4th round", CanonicalRound::R16),
            ("3rd round", CanonicalRound::R32),
            ("2nd round", CanonicalRound::R64),
            ("1st round", CanonicalRound::R128),
        ] {
            if label.contains(ordinal) {
                return round;
            }
        }

        CanonicalRound::Unknown
    }
}
