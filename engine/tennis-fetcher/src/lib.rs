//! Tennis Fetcher Service
//!
//! Fetches match results (live events API, yearly results files, results
//! pages) and ranking tables, and syncs them into the fantasy store through
//! the match sync engine. Runs once or daily on a schedule.

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod rankings;
pub mod scheduler;
pub mod tabular;

pub use config::FetcherConfig;
pub use fetcher::LiveApiClient;
pub use logging::initialize_logging;
pub use models::*;
pub use pipeline::{Pipeline, RunReport};
pub use rankings::{sync_rankings, RankingsSummary};
pub use scheduler::FetcherScheduler;
pub use tabular::{parse_results, TabularSource};
