//! Yearly results files (one CSV per year and tour)

use crate::config::TabularConfig;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tennis_core::{Participant, RoundLabel, Side, SourceEvent, SourceSchema, Tour};
use tracing::{debug, info};

/// Lowercase, spaces to `_`, dots removed, then the per-tour renames
pub fn normalize_header(header: &str) -> String {
    let name = header.trim().to_lowercase().replace(' ', "_").replace('.', "");
    match name.as_str() {
        "atp" | "wta" => "tournament_id".to_string(),
        "tier" => "series".to_string(),
        _ => name,
    }
}

/// Events decoded from one file
#[derive(Debug, Default)]
pub struct TabularBatch {
    pub events: Vec<SourceEvent>,
    /// Rows older than the cutoff
    pub stale: usize,
    /// Rows without players or a readable date
    pub unreadable: usize,
}

struct Row<'a> {
    headers: &'a [String],
    record: &'a StringRecord,
}

impl Row<'_> {
    fn get(&self, column: &str) -> Option<&str> {
        let index = self.headers.iter().position(|h| h == column)?;
        self.record.get(index).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Integer cell; spreadsheets export "1234.0" and "NR"
    fn number(&self, column: &str) -> Option<i32> {
        let value = self.get(column)?;
        value
            .parse::<i32>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.round() as i32))
    }

    fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .headers
            .iter()
            .zip(self.record.iter())
            .map(|(h, v)| (h.clone(), Value::String(v.to_string())))
            .collect();
        Value::Object(map)
    }
}

fn parse_row_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y-%m-%d %H:%M:%S", "%d.%m.%Y"];
    FORMATS.iter().find_map(|f| {
        NaiveDate::parse_from_str(raw, f)
            .ok()
            .or_else(|| chrono::NaiveDateTime::parse_from_str(raw, f).ok().map(|dt| dt.date()))
    })
}

fn score(row: &Row) -> Option<String> {
    let sets: Vec<String> = (1..=5)
        .filter_map(|set| {
            let won = row.number(&format!("w{}", set))?;
            let lost = row.number(&format!("l{}", set))?;
            Some(format!("{}-{}", won, lost))
        })
        .collect();
    (!sets.is_empty()).then(|| sets.join(", "))
}

/// Decode a results file; rows dated before `cutoff` are counted as stale
pub fn parse_results(content: &str, tour: Tour, cutoff: Option<NaiveDate>) -> Result<TabularBatch> {
    let mut reader = ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_reader(content.as_bytes());
    let headers: Vec<String> =
        reader.headers().context("Failed to read CSV header")?.iter().map(normalize_header).collect();

    let mut batch = TabularBatch::default();
    for record in reader.records() {
        let record = record.context("Failed to read CSV row")?;
        let row = Row { headers: &headers, record: &record };

        let (Some(winner), Some(loser)) = (row.get("winner"), row.get("loser")) else {
            batch.unreadable += 1;
            continue;
        };
        let Some(date) = row.get("date").and_then(parse_row_date) else {
            debug!("Skipping row without a readable date: {} vs {}", winner, loser);
            batch.unreadable += 1;
            continue;
        };
        if cutoff.is_some_and(|cutoff| date < cutoff) {
            batch.stale += 1;
            continue;
        }

        let mut event = SourceEvent::new(SourceSchema::TabularResults, tour, row.to_json());
        event.tournament_name = row.get("tournament").map(str::to_string);
        event.tournament_level = row.get("series").map(str::to_string);
        event.date = Some(date.format("%Y-%m-%d").to_string());
        event.round = row.get("round").map(RoundLabel::text);
        event.player1 = Some(Participant::Named {
            name: winner.to_string(),
            rank: row.number("wrank"),
            points: row.number("wpts"),
        });
        event.player2 = Some(Participant::Named {
            name: loser.to_string(),
            rank: row.number("lrank"),
            points: row.number("lpts"),
        });
        event.winner = Some(Side::Player1);
        event.score = score(&row);
        event.surface = row.get("surface").map(str::to_string);
        batch.events.push(event);
    }

    Ok(batch)
}

/// Downloads yearly results files
pub struct TabularSource {
    config: TabularConfig,
    client: Client,
}

impl TabularSource {
    pub fn new(config: TabularConfig, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &TabularConfig {
        &self.config
    }

    pub async fn download(&self, year: i32, tour: Tour) -> Result<String> {
        let url = self.config.url_for(year, tour);
        info!("📥 Downloading {} {} results from {}", tour, year, url);

        let response = self.client.get(&url).send().await.with_context(|| format!("Failed to fetch {}", url))?;
        if !response.status().is_success() {
            anyhow::bail!("Download of {} failed with status: {}", url, response.status());
        }

        let content = response.text().await.context("Failed to read results file")?;
        info!("Downloaded {} {} results ({} bytes)", tour, year, content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATP_FILE: &str = "\
ATP,Location,Tournament,Date,Series,Court,Surface,Round,Best of,Winner,Loser,WRank,LRank,WPts,LPts,W1,L1,W2,L2,W3,L3,W4,L4,W5,L5
6,Melbourne,Australian Open,2026-02-01,Grand Slam,Outdoor,Hard,The Final,5,Djokovic N.,Alcaraz C.,4,1,4830,12050,6,2,6,2,6,3,,,,
6,Melbourne,Australian Open,2026-01-30,Grand Slam,Outdoor,Hard,Semifinals,5,Alcaraz C.,Zverev A.,1,3,12050.0,6000.0,6,4,7,6,,,,,,
1,Brisbane,Brisbane International,2025-12-30,ATP250,Outdoor,Hard,1st Round,3,Mensik J.,Nakashima B.,NR,34,,1120,6,4,6,4,,,,,,
1,Brisbane,Brisbane International,not a date,ATP250,Outdoor,Hard,1st Round,3,Fritz T.,Paul T.,4,12,,,,,,,,,,,,
";

    const WTA_FILE: &str = "\
WTA,Location,Tournament,Date,Tier,Court,Surface,Round,Best of,Winner,Loser,WRank,LRank,WPts,LPts
9,Doha,Qatar Open,12/02/2026,WTA1000,Outdoor,Hard,Quarterfinals,3,Sabalenka A.,Swiatek I.,1,2,10000,8000
";

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Best of"), "best_of");
        assert_eq!(normalize_header("W.Rank"), "wrank");
        assert_eq!(normalize_header("ATP"), "tournament_id");
        assert_eq!(normalize_header("WTA"), "tournament_id");
        assert_eq!(normalize_header("Tier"), "series");
    }

    #[test]
    fn test_parse_atp_file() {
        let batch = parse_results(ATP_FILE, Tour::Atp, None).unwrap();
        assert_eq!(batch.events.len(), 3);
        assert_eq!(batch.unreadable, 1);

        let final_match = &batch.events[0];
        assert_eq!(final_match.schema, SourceSchema::TabularResults);
        assert_eq!(final_match.tournament_level.as_deref(), Some("Grand Slam"));
        assert_eq!(final_match.round, Some(RoundLabel::text("The Final")));
        assert_eq!(final_match.score.as_deref(), Some("6-2, 6-2, 6-3"));
        assert_eq!(final_match.winner, Some(Side::Player1));
        assert_eq!(
            final_match.player1,
            Some(Participant::Named { name: "Djokovic N.".to_string(), rank: Some(4), points: Some(4830) })
        );
        assert_eq!(final_match.raw["tournament_id"], "6");

        let semi = &batch.events[1];
        assert_eq!(semi.player1.as_ref().and_then(|p| p.observed_points()), Some(12050));

        let unranked = &batch.events[2];
        assert_eq!(unranked.player1.as_ref().and_then(|p| p.observed_rank()), None);
        assert_eq!(unranked.player2.as_ref().and_then(|p| p.observed_points()), Some(1120));
    }

    #[test]
    fn test_cutoff_drops_old_rows() {
        let cutoff = NaiveDate::from_ymd_opt(2026, 1, 1);
        let batch = parse_results(ATP_FILE, Tour::Atp, cutoff).unwrap();
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.stale, 1);
    }

    #[test]
    fn test_parse_wta_file() {
        let batch = parse_results(WTA_FILE, Tour::Wta, None).unwrap();
        assert_eq!(batch.events.len(), 1);

        let event = &batch.events[0];
        assert_eq!(event.tour, Tour::Wta);
        assert_eq!(event.tournament_level.as_deref(), Some("WTA1000"));
        assert_eq!(event.date.as_deref(), Some("2026-02-12"));
        assert_eq!(event.score, None);
    }
}
