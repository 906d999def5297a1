//! Tennis Core - canonical types and scoring policy
//!
//! This crate holds everything the ingestion pipeline agrees on regardless of
//! where the data came from: the canonical match/player types, the name
//! normalizer used for identity matching, the round mapper and the ranking
//! points table.

pub mod error;
pub mod names;
pub mod points;
pub mod rounds;
pub mod types;

pub use error::{Result, TennisError};
pub use names::normalize;
pub use points::{level_from_tournament_name, PointsPolicy, TournamentLevel};
pub use rounds::{CanonicalRound, RoundMapper, RoundVocabulary};
pub use types::*;

/// Rank assigned to players created before any ranking observation exists
pub const DEFAULT_PROVISIONAL_RANK: i32 = 999;

/// Trailing window used for rolling ranking points
pub const ROLLING_POINTS_WINDOW_DAYS: i64 = 365;

/// Days either side of a match date that still count as the same tournament edition
pub const TOURNAMENT_SPAN_DAYS: i64 = 14;
