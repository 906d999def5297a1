//! One pass over every enabled source, sequentially, through a single sync engine

use crate::config::FetcherConfig;
use crate::fetcher::LiveApiClient;
use crate::models::{decode_events, FetcherEvent};
use crate::rankings::{sync_rankings, RankingsSummary};
use crate::tabular::{parse_results, TabularSource};
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use match_sync::{read_raw_dump, write_failure_dump, write_raw_dump, FailureDump, SyncConfig, SyncEngine, SyncSummary};
use results_scraper::ResultsScraper;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tennis_core::{KeyPolicy, SourceEvent, SourceSchema, Tour};
use tennis_store::Store;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Outcome of a pipeline pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub matches: SyncSummary,
    pub rankings: Vec<(Tour, RankingsSummary)>,
    pub events: Vec<FetcherEvent>,
}

impl RunReport {
    fn fetch_failed(&mut self, endpoint: String, error: &anyhow::Error) {
        error!("❌ Fetch of {} failed: {:#}", endpoint, error);
        self.events.push(FetcherEvent::FetchFailed {
            endpoint,
            error: format!("{:#}", error),
            timestamp: Utc::now(),
        });
    }

    fn matches_synced(&mut self, source: &str, summary: SyncSummary) {
        self.events.push(FetcherEvent::MatchesSynced {
            source: source.to_string(),
            inserted: summary.inserted,
            updated: summary.updated,
            skipped: summary.skipped,
            rejected: summary.rejected,
            failed: summary.failed,
            timestamp: Utc::now(),
        });
        self.matches.absorb(summary);
    }
}

/// Wires the sources to the store
pub struct Pipeline {
    config: FetcherConfig,
    store: Arc<dyn Store>,
    live: Option<LiveApiClient>,
    tabular: TabularSource,
    scraper: ResultsScraper,
}

impl Pipeline {
    pub fn new(config: FetcherConfig, store: Arc<dyn Store>) -> Result<Self> {
        let live = match config.api_key() {
            Ok(key) => Some(LiveApiClient::new(config.api.clone(), key)?),
            Err(e) => {
                warn!("Live API disabled: {}", e);
                None
            }
        };
        let tabular = TabularSource::new(config.tabular.clone(), config.api.timeout_seconds)?;
        let scraper = ResultsScraper::new(config.scraper.clone())?;

        Ok(Self { config, store, live, tabular, scraper })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            unknown_round: self.config.sync.unknown_round,
            season: self.config.sync.season,
            prefer_server_side_aggregation: self.config.sync.prefer_server_side_aggregation,
            ..SyncConfig::default()
        }
    }

    /// Fresh engine with its resolver warmed from the store
    pub async fn engine(&self) -> SyncEngine {
        let mut engine = SyncEngine::new(self.store.clone(), self.sync_config());
        match engine.preload_players().await {
            Ok(count) => info!("Preloaded {} players", count),
            Err(e) => warn!("Failed to preload players, resolving on demand: {}", e),
        }
        engine
    }

    async fn courtesy_delay(ms: u64) {
        if ms > 0 {
            sleep(StdDuration::from_millis(ms)).await;
        }
    }

    async fn dump_failures(&self, source: &str, summary: &SyncSummary, report: &mut RunReport) {
        if !self.config.dumps.write_failures {
            return;
        }
        match write_failure_dump(&self.config.dumps.dir, source, &summary.failures).await {
            Ok(Some(path)) => report.events.push(FetcherEvent::DumpWritten { path, timestamp: Utc::now() }),
            Ok(None) => {}
            Err(e) => error!("Failed to write failure dump: {}", e),
        }
    }

    /// Full pass: results files, live events, the scraper, then rankings
    pub async fn run_once(&self, today: NaiveDate) -> RunReport {
        info!("🚀 Starting tennis sync for {}", today);
        let mut engine = self.engine().await;
        let mut report = RunReport::default();
        let scheduler = &self.config.scheduler;

        if scheduler.enable_tabular && self.config.tabular.enabled {
            self.run_tabular(&mut engine, today, &mut report).await;
        }
        if scheduler.enable_live && self.live.is_some() {
            self.run_live(&mut engine, today, &mut report).await;
        }
        if scheduler.enable_scraper {
            self.run_scrape(&mut engine, &mut report).await;
        }
        // Last, so today's table is the newest observation a player row sees
        if scheduler.enable_rankings && self.live.is_some() {
            self.run_rankings(&mut engine, today, &mut report).await;
        }

        let summary = &report.matches;
        info!(
            "✅ Tennis sync finished: {} inserted, {} updated, {} skipped, {} rejected, {} failed",
            summary.inserted, summary.updated, summary.skipped, summary.rejected, summary.failed
        );
        report
    }

    /// Live events for every day of the fetch window, keyed on provider match id
    pub async fn run_live(&self, engine: &mut SyncEngine, today: NaiveDate, report: &mut RunReport) {
        let Some(live) = &self.live else {
            warn!("Live API disabled, skipping live events");
            return;
        };

        let mut summary = SyncSummary::default();
        for (i, date) in live.fetch_window(today).into_iter().enumerate() {
            if i > 0 {
                Self::courtesy_delay(self.config.api.courtesy_delay_ms).await;
            }
            match live.fetch_events(date).await {
                Ok(payload) => summary.absorb(self.ingest_live_payload(engine, date, &payload).await),
                Err(e) => report.fetch_failed(format!("events {}", date), &e),
            }
        }

        self.dump_failures(SourceSchema::LiveEvents.as_str(), &summary, report).await;
        report.matches_synced(SourceSchema::LiveEvents.as_str(), summary);
    }

    /// Dump and sync one day's live payload
    pub async fn ingest_live_payload(&self, engine: &mut SyncEngine, date: NaiveDate, payload: &Value) -> SyncSummary {
        if self.config.dumps.write_raw {
            if let Err(e) = write_raw_dump(&self.config.dumps.dir, date, payload).await {
                warn!("Failed to write raw dump for {}: {}", date, e);
            }
        }

        let (events, malformed) = decode_events(payload);
        if malformed > 0 {
            warn!("{} events of {} did not decode", malformed, date);
        }
        engine.sync_batch(events, KeyPolicy::ProviderMatchId).await
    }

    /// Yearly results files for both tours, limited to the configured window
    pub async fn run_tabular(&self, engine: &mut SyncEngine, today: NaiveDate, report: &mut RunReport) {
        let mut summary = SyncSummary::default();
        let mut first = true;

        for year in self.config.tabular_years() {
            for tour in Tour::ALL {
                if !first {
                    Self::courtesy_delay(self.config.tabular.courtesy_delay_ms).await;
                }
                first = false;

                match self.tabular.download(year, tour).await {
                    Ok(content) => match self.ingest_tabular(engine, &content, tour, today).await {
                        Ok(batch) => summary.absorb(batch),
                        Err(e) => report.fetch_failed(format!("{} {} results file", tour, year), &e),
                    },
                    Err(e) => report.fetch_failed(format!("{} {} results file", tour, year), &e),
                }
            }
        }

        self.dump_failures(SourceSchema::TabularResults.as_str(), &summary, report).await;
        report.matches_synced(SourceSchema::TabularResults.as_str(), summary);
    }

    /// Parse and sync one results file
    pub async fn ingest_tabular(
        &self,
        engine: &mut SyncEngine,
        content: &str,
        tour: Tour,
        today: NaiveDate,
    ) -> Result<SyncSummary> {
        let cutoff = today - Duration::days(self.tabular.config().days_back);
        let batch = parse_results(content, tour, Some(cutoff))?;
        info!(
            "Read {} {} rows since {} ({} older, {} unreadable)",
            batch.events.len(),
            tour,
            cutoff,
            batch.stale,
            batch.unreadable
        );
        Ok(engine.sync_batch(batch.events, KeyPolicy::PairAndDate).await)
    }

    /// Ranking tables of both tours, dated `today`
    pub async fn run_rankings(&self, engine: &mut SyncEngine, today: NaiveDate, report: &mut RunReport) {
        let Some(live) = &self.live else {
            warn!("Live API disabled, skipping rankings");
            return;
        };

        for (i, tour) in Tour::ALL.into_iter().enumerate() {
            if i > 0 {
                Self::courtesy_delay(self.config.api.courtesy_delay_ms).await;
            }
            match live.fetch_rankings(tour).await {
                Ok(payload) => {
                    let summary =
                        sync_rankings(self.store.as_ref(), engine.resolver_mut(), tour, &payload, today).await;
                    report.events.push(FetcherEvent::RankingsSynced {
                        tour,
                        count: summary.upserted,
                        timestamp: Utc::now(),
                    });
                    report.rankings.push((tour, summary));
                }
                Err(e) => report.fetch_failed(format!("{} rankings", tour), &e),
            }
        }
    }

    /// Best-effort results pages
    pub async fn run_scrape(&self, engine: &mut SyncEngine, report: &mut RunReport) {
        let events = self.scraper.scrape_all().await;
        if events.is_empty() {
            warn!("Scraper returned no matches");
        }
        let summary = self.ingest_scraped(engine, events).await;

        self.dump_failures(SourceSchema::ScrapedResults.as_str(), &summary, report).await;
        report.matches_synced(SourceSchema::ScrapedResults.as_str(), summary);
    }

    /// Sync scraped matches; page dates are approximate, so duplicates are
    /// detected per pair within the tournament edition
    pub async fn ingest_scraped(&self, engine: &mut SyncEngine, events: Vec<SourceEvent>) -> SyncSummary {
        engine.sync_batch(events, KeyPolicy::PairInTournament).await
    }

    /// Re-run a failure dump or a raw live payload dump through the engine
    pub async fn replay(&self, path: &Path) -> Result<RunReport> {
        let value = read_raw_dump(path).await.with_context(|| format!("Failed to read dump {}", path.display()))?;

        let (source, events) = if value.get("records").is_some() {
            let dump: FailureDump = serde_json::from_value(value)
                .with_context(|| format!("Failed to decode failure dump {}", path.display()))?;
            info!("🔁 Replaying {} failed {} records from {}", dump.records.len(), dump.source, dump.fetched_at);
            let events = dump.records.into_iter().map(|r| r.event).collect::<Vec<_>>();
            (dump.source, events)
        } else {
            let (events, malformed) = decode_events(&value);
            info!("🔁 Replaying {} live events ({} malformed) from {}", events.len(), malformed, path.display());
            (SourceSchema::LiveEvents.as_str().to_string(), events)
        };

        // Events without a provider id fall back to the pair key
        let key_policy = if source == SourceSchema::ScrapedResults.as_str() {
            KeyPolicy::PairInTournament
        } else {
            KeyPolicy::ProviderMatchId
        };
        let mut engine = self.engine().await;
        let mut report = RunReport::default();
        let summary = engine.sync_batch(events, key_policy).await;
        self.dump_failures(&source, &summary, &mut report).await;
        report.matches_synced(&source, summary);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_sync::FailedRecord;
    use serde_json::json;
    use tennis_core::{Participant, RoundLabel, Side};
    use tennis_store::MemoryStore;

    fn pipeline(dir: &Path) -> (Arc<MemoryStore>, Pipeline) {
        let mut config = FetcherConfig::default();
        config.dumps.dir = dir.to_path_buf();
        config.sync.season = 2026;
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(config, store.clone()).unwrap();
        (store, pipeline)
    }

    fn live_payload() -> Value {
        json!({
            "events": [{
                "id": 501,
                "tournament": {
                    "name": "Indian Wells, USA",
                    "category": {"name": "ATP", "slug": "atp"},
                    "uniqueTournament": {"name": "Indian Wells", "tennisPoints": 1000}
                },
                "season": {"name": "ATP Indian Wells 2026"},
                "roundInfo": {"name": "Semifinal", "cupRoundType": 2},
                "homeTeam": {"id": 10, "name": "Medvedev D."},
                "awayTeam": {"id": 11, "name": "Fritz T."},
                "status": {"type": "finished"},
                "winnerCode": 2,
                "startTimestamp": 1773446400,
                "eventFilters": {"category": ["singles"]}
            }]
        })
    }

    #[tokio::test]
    async fn test_live_payload_is_dumped_and_synced() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path());
        let mut engine = pipeline.engine().await;
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        let summary = pipeline.ingest_live_payload(&mut engine, date, &live_payload()).await;
        assert_eq!(summary.inserted, 1);
        assert!(dir.path().join("matches_2026-03-14.json").exists());

        let matches = store.matches().await;
        assert_eq!(matches[0].record.player1.points_earned, 180);
        assert_eq!(matches[0].record.player2.points_earned, 360);

        // Same payload again replaces the row in place
        let summary = pipeline.ingest_live_payload(&mut engine, date, &live_payload()).await;
        assert_eq!(summary.updated, 1);
        assert_eq!(store.matches().await.len(), 1);
    }

    #[tokio::test]
    async fn test_tabular_content_is_synced_once() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path());
        let mut engine = pipeline.engine().await;
        let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let content = "\
ATP,Tournament,Date,Series,Surface,Round,Winner,Loser,WRank,LRank,WPts,LPts,W1,L1,W2,L2,W3,L3
6,Australian Open,2026-02-01,Grand Slam,Hard,The Final,Djokovic N.,Alcaraz C.,4,1,4830,12050,6,2,6,2,6,3
1,Brisbane International,2025-12-30,ATP250,Hard,1st Round,Mensik J.,Nakashima B.,20,34,1500,1120,6,4,6,4,,
";

        let summary = pipeline.ingest_tabular(&mut engine, content, Tour::Atp, today).await.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(store.matches().await[0].record.player1.points_earned, 2000);

        let summary = pipeline.ingest_tabular(&mut engine, content, Tour::Atp, today).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.matches().await.len(), 1);
    }

    #[tokio::test]
    async fn test_older_match_keeps_newer_ranking() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path());
        let mut engine = pipeline.engine().await;

        let table = json!({"rankings": [{"team": {"id": 275923, "name": "Alcaraz C."}, "ranking": 1, "points": 12000}]});
        let ranked_on = NaiveDate::from_ymd_opt(2026, 3, 30).unwrap();
        sync_rankings(store.as_ref(), engine.resolver_mut(), Tour::Atp, &table, ranked_on).await;

        let content = "\
ATP,Tournament,Date,Series,Surface,Round,Winner,Loser,WRank,LRank,WPts,LPts
9,Indian Wells Masters,2026-03-01,Masters 1000,Hard,Quarterfinals,Alcaraz C.,Draper J.,3,14,7000,3000
";
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let summary = pipeline.ingest_tabular(&mut engine, content, Tour::Atp, today).await.unwrap();
        assert_eq!(summary.inserted, 1);

        let players = store.players().await;
        let alcaraz = players.iter().find(|p| p.provider_id == Some(275923)).unwrap();
        assert_eq!(alcaraz.rank, Some(1));
        assert_eq!(alcaraz.points, 12000);

        // No snapshot for the loser, so the match observation applies
        let draper = players.iter().find(|p| p.normalized_name == "draper j.").unwrap();
        assert_eq!(draper.rank, Some(14));
    }

    #[tokio::test]
    async fn test_rescraped_results_are_not_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path());
        let mut engine = pipeline.engine().await;
        let page = r#"
            <div class="match-card">
              <div class="tournament-name">Qatar TotalEnergies Open, Doha</div>
              <div class="round">Final</div>
              <div class="player-name">Aryna Sabalenka</div>
              <div class="player-name">Iga Swiatek</div>
              <div class="score">6-3 6-2</div>
            </div>
        "#;

        let mut inserted = Vec::new();
        for day in ["2026-02-14", "2026-02-15"] {
            let events = pipeline
                .scraper
                .parse_wta_results(page, day)
                .unwrap()
                .into_iter()
                .map(|m| m.into_source_event())
                .collect();
            inserted.push(pipeline.ingest_scraped(&mut engine, events).await.inserted);
        }

        assert_eq!(inserted, vec![1, 0]);
        assert_eq!(store.matches().await.len(), 1);
    }

    #[tokio::test]
    async fn test_replay_failure_dump() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path());

        let mut event = SourceEvent::new(SourceSchema::TabularResults, Tour::Wta, json!({"winner": "Gauff C."}));
        event.tournament_name = Some("Qatar Open".to_string());
        event.tournament_level = Some("WTA 1000".to_string());
        event.date = Some("2026-02-14".to_string());
        event.round = Some(RoundLabel::text("Final"));
        event.player1 = Some(Participant::named("Gauff C."));
        event.player2 = Some(Participant::named("Rybakina E."));
        event.winner = Some(Side::Player1);

        let failed = vec![FailedRecord { event, error: "Persistence error: simulated".to_string() }];
        let path = write_failure_dump(dir.path(), "tabular_results", &failed).await.unwrap().unwrap();

        let report = pipeline.replay(&path).await.unwrap();
        assert_eq!(report.matches.inserted, 1);
        assert_eq!(report.matches.failed, 0);

        let matches = store.matches().await;
        assert_eq!(matches[0].record.player1.points_earned, 1000);
        assert_eq!(matches[0].record.player2.points_earned, 600);
    }

    #[tokio::test]
    async fn test_replay_raw_dump() {
        let dir = tempfile::tempdir().unwrap();
        let (store, pipeline) = pipeline(dir.path());
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let path = write_raw_dump(dir.path(), date, &live_payload()).await.unwrap();

        let report = pipeline.replay(&path).await.unwrap();
        assert_eq!(report.matches.inserted, 1);
        assert_eq!(store.matches().await[0].record.provider_match_id, Some(501));
    }

    #[tokio::test]
    async fn test_live_sources_skipped_without_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, mut pipeline) = pipeline(dir.path());
        pipeline.config.scheduler.enable_tabular = false;

        let report = pipeline.run_once(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()).await;
        assert_eq!(report.matches.total(), 0);
        assert!(report.rankings.is_empty());
        assert!(report.events.is_empty());
    }
}
