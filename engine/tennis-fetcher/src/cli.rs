//! # Command Line Interface
//!
//! `tennis-sync` runs one pipeline step, the full pipeline once, or the daily scheduler.

use crate::config::FetcherConfig;
use crate::pipeline::{Pipeline, RunReport};
use crate::scheduler::FetcherScheduler;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tennis results and rankings sync
#[derive(Parser, Debug)]
#[command(name = "tennis-sync")]
#[command(about = "Fetch tennis results and rankings into the fantasy store")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use an in-memory store instead of the database
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Reference date (YYYY-MM-DD); today when omitted
    #[arg(long, global = true)]
    pub date: Option<NaiveDate>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Run every enabled source once
    Once,
    /// Run every enabled source daily at the configured time
    Schedule {
        /// Also run once right away
        #[arg(long)]
        run_now: bool,
    },
    /// Sync live events around the reference date
    Matches {
        /// Days before the reference date
        #[arg(long)]
        days_back: Option<i64>,
        /// Days after the reference date
        #[arg(long)]
        days_forward: Option<i64>,
    },
    /// Sync the yearly results files
    Csv {
        /// Results year; the season when omitted
        #[arg(long)]
        year: Option<i32>,
        /// Only rows this many days old or newer
        #[arg(long)]
        days_back: Option<i64>,
    },
    /// Sync the ATP and WTA ranking tables
    Rankings,
    /// Scrape the tour results pages
    Scrape,
    /// Re-sync a failure dump or a raw events dump
    Replay {
        /// Dump file written by an earlier run
        path: PathBuf,
    },
    /// Recompute rank, rolling points and season points for every player
    Recompute,
}

impl Commands {
    /// Fold command options into the configuration
    pub fn apply_to(&self, config: &mut FetcherConfig) {
        match self {
            Commands::Schedule { run_now } => config.scheduler.run_at_startup |= *run_now,
            Commands::Matches { days_back, days_forward } => {
                if let Some(days_back) = days_back {
                    config.api.days_back = *days_back;
                }
                if let Some(days_forward) = days_forward {
                    config.api.days_forward = *days_forward;
                }
            }
            Commands::Csv { year, days_back } => {
                if let Some(year) = year {
                    config.tabular.years = vec![*year];
                }
                if let Some(days_back) = days_back {
                    config.tabular.days_back = *days_back;
                }
            }
            _ => {}
        }
    }
}

/// CLI handler
pub struct CliHandler {
    pipeline: Pipeline,
    today: NaiveDate,
}

impl CliHandler {
    pub fn new(pipeline: Pipeline, date: Option<NaiveDate>) -> Self {
        Self { pipeline, today: date.unwrap_or_else(|| Utc::now().date_naive()) }
    }

    /// Handle CLI commands
    pub async fn handle_command(self, command: Commands) -> Result<()> {
        let report = match command {
            Commands::Once => self.pipeline.run_once(self.today).await,
            Commands::Schedule { .. } => {
                let scheduler_config = self.pipeline.config().scheduler.clone();
                let scheduler = FetcherScheduler::new(self.pipeline, &scheduler_config)?;
                return scheduler.start().await;
            }
            Commands::Matches { .. } => {
                let mut engine = self.pipeline.engine().await;
                let mut report = RunReport::default();
                self.pipeline.run_live(&mut engine, self.today, &mut report).await;
                report
            }
            Commands::Csv { .. } => {
                let mut engine = self.pipeline.engine().await;
                let mut report = RunReport::default();
                self.pipeline.run_tabular(&mut engine, self.today, &mut report).await;
                report
            }
            Commands::Rankings => {
                let mut engine = self.pipeline.engine().await;
                let mut report = RunReport::default();
                self.pipeline.run_rankings(&mut engine, self.today, &mut report).await;
                report
            }
            Commands::Scrape => {
                let mut engine = self.pipeline.engine().await;
                let mut report = RunReport::default();
                self.pipeline.run_scrape(&mut engine, &mut report).await;
                report
            }
            Commands::Replay { path } => self.pipeline.replay(&path).await?,
            Commands::Recompute => {
                let engine = self.pipeline.engine().await;
                let aggregates = engine.recompute_all().await?;
                println!("🔢 Aggregates recomputed");
                println!("{}", "=".repeat(50));
                println!("Players ranked:        {}", aggregates.players_ranked);
                println!("Players rolled:        {}", aggregates.players_rolled);
                println!("Season stats updated:  {}", aggregates.season_stats_updated);
                println!("Failures:              {}", aggregates.failures);
                return Ok(());
            }
        };

        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    let matches = &report.matches;
    println!("🎾 Sync Summary");
    println!("{}", "=".repeat(50));
    println!("Inserted:  {}", matches.inserted);
    println!("Updated:   {}", matches.updated);
    println!("Skipped:   {}", matches.skipped);
    println!("Rejected:  {}", matches.rejected);
    println!("Failed:    {}", matches.failed);

    for (tour, rankings) in &report.rankings {
        println!(
            "{} rankings: {} upserted ({} new players), {} failed",
            tour, rankings.upserted, rankings.players_created, rankings.failed
        );
    }

    if let Some(aggregates) = &matches.aggregates {
        println!(
            "Aggregates: {} ranked, {} rolled, {} season stats, {} failures",
            aggregates.players_ranked, aggregates.players_rolled, aggregates.season_stats_updated, aggregates.failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["tennis-sync", "--dry-run", "csv", "--year", "2025", "--days-back", "400"]);
        assert!(cli.dry_run);
        assert_eq!(cli.command, Commands::Csv { year: Some(2025), days_back: Some(400) });

        let cli = Cli::parse_from(["tennis-sync", "replay", "tennis_data/errors_20260314_060000.json"]);
        assert_eq!(cli.command, Commands::Replay { path: PathBuf::from("tennis_data/errors_20260314_060000.json") });

        let cli = Cli::parse_from(["tennis-sync", "matches", "--date", "2026-03-14"]);
        assert_eq!(cli.date, NaiveDate::from_ymd_opt(2026, 3, 14));
    }

    #[test]
    fn test_command_options_override_config() {
        let mut config = FetcherConfig::default();
        Commands::Csv { year: Some(2025), days_back: Some(400) }.apply_to(&mut config);
        Commands::Matches { days_back: Some(7), days_forward: None }.apply_to(&mut config);
        Commands::Schedule { run_now: true }.apply_to(&mut config);

        assert_eq!(config.tabular_years(), vec![2025]);
        assert_eq!(config.tabular.days_back, 400);
        assert_eq!(config.api.days_back, 7);
        assert_eq!(config.api.days_forward, 2);
        assert!(config.scheduler.run_at_startup);
    }
}
