use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tennis_core::{SourceEvent, Tour};
use tracing::{info, warn};

use crate::types::{ScrapedMatch, ScrapedResults};

/// Scraper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub atp_results_url: String,
    pub wta_results_url: String,
    /// Most recent tournament blocks to read per page
    pub max_tournaments: usize,
    pub max_matches_per_tournament: usize,
    pub timeout_seconds: u64,
    /// Pause between requests to the same site
    pub courtesy_delay_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            atp_results_url: "https://www.atptour.com/en/scores/results-archive".to_string(),
            wta_results_url: "https://www.wtatennis.com/scores".to_string(),
            max_tournaments: 5,
            max_matches_per_tournament: 10,
            timeout_seconds: 30,
            courtesy_delay_ms: 500,
        }
    }
}

/// Selectors of the ATP results archive
struct AtpSelectors {
    block: Selector,
    title: Selector,
    dates: Selector,
    surface: Selector,
    card: Selector,
    round: Selector,
    player: Selector,
    score: Selector,
}

impl AtpSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            block: selector("div.tournament-block")?,
            title: selector("span.tourney-title")?,
            dates: selector("span.tourney-dates")?,
            surface: selector("span.item-surface")?,
            card: selector("div.day-item")?,
            round: selector("span.round-title")?,
            player: selector("a.player-name")?,
            score: selector("div.match-score")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Failed to create selector '{}': {}", css, e))
}

fn text_of(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|e| e.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
}

/// ATP/WTA results page scraper
///
/// Best effort: markup changes make it return fewer matches, not errors.
pub struct ResultsScraper {
    client: Client,
    config: ScraperConfig,
}

impl ResultsScraper {
    /// Create a new results scraper
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        info!("Fetching data from: {}", url);
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP request failed with status: {}", response.status());
        }

        let html = response.text().await.context("Failed to read response body")?;
        info!("Successfully fetched HTML ({} bytes)", html.len());
        Ok(html)
    }

    pub async fn scrape_atp(&self) -> Result<ScrapedResults> {
        let html = self.fetch_page(&self.config.atp_results_url).await?;
        let mut results = ScrapedResults::new(Tour::Atp);
        results.matches = self.parse_atp_results(&html)?;
        info!("✅ Scraped {} ATP match results", results.matches.len());
        Ok(results)
    }

    pub async fn scrape_wta(&self) -> Result<ScrapedResults> {
        let html = self.fetch_page(&self.config.wta_results_url).await?;
        let mut results = ScrapedResults::new(Tour::Wta);
        let today = results.scraped_at.date_naive().format("%Y-%m-%d").to_string();
        results.matches = self.parse_wta_results(&html, &today)?;
        info!("✅ Scraped {} WTA match results", results.matches.len());
        Ok(results)
    }

    /// Scrape both tours; a failing tour is logged and contributes nothing
    pub async fn scrape_all(&self) -> Vec<SourceEvent> {
        let mut events = Vec::new();

        match self.scrape_atp().await {
            Ok(results) => events.extend(results.into_source_events()),
            Err(e) => warn!("❌ Error scraping ATP results: {:#}", e),
        }

        // Add a small delay to be respectful to the server
        tokio::time::sleep(Duration::from_millis(self.config.courtesy_delay_ms)).await;

        match self.scrape_wta().await {
            Ok(results) => events.extend(results.into_source_events()),
            Err(e) => warn!("❌ Error scraping WTA results: {:#}", e),
        }

        events
    }

    /// Parse tournament blocks of the ATP results archive
    pub fn parse_atp_results(&self, html: &str) -> Result<Vec<ScrapedMatch>> {
        let document = Html::parse_document(html);
        let selectors = AtpSelectors::new()?;
        let mut matches = Vec::new();

        for block in document.select(&selectors.block).take(self.config.max_tournaments) {
            let tournament_name = text_of(&block, &selectors.title).unwrap_or_else(|| "Unknown".to_string());
            // "2026.01.12 - 2026.01.25": the first date stands for the event
            let date = text_of(&block, &selectors.dates)
                .map(|d| d.split(" - ").next().unwrap_or_default().trim().to_string());
            let surface = text_of(&block, &selectors.surface).or_else(|| Some("Hard".to_string()));

            for (card_index, card) in block.select(&selectors.card).take(self.config.max_matches_per_tournament).enumerate() {
                let players: Vec<String> = card
                    .select(&selectors.player)
                    .map(|p| p.text().collect::<String>().trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect();
                if players.len() < 2 {
                    warn!("Skipping match card {} of {}: fewer than two players", card_index, tournament_name);
                    continue;
                }

                let mut scraped = ScrapedMatch::new(Tour::Atp, &tournament_name, &players[0], &players[1]);
                scraped.date = date.clone();
                scraped.round = text_of(&card, &selectors.round);
                scraped.score = text_of(&card, &selectors.score);
                scraped.surface = surface.clone();
                matches.push(scraped);
            }
        }

        Ok(matches)
    }

    /// Parse match cards of the WTA scores page; cards carry no date, so `today` is used
    pub fn parse_wta_results(&self, html: &str, today: &str) -> Result<Vec<ScrapedMatch>> {
        let document = Html::parse_document(html);
        let card_selector = selector("div.match-card")?;
        let tournament_selector = selector("div.tournament-name")?;
        let player_selector = selector("div.player-name")?;
        let round_selector = selector("div.round")?;
        let score_selector = selector("div.score")?;

        let mut matches = Vec::new();
        let limit = self.config.max_tournaments * self.config.max_matches_per_tournament;
        for card in document.select(&card_selector).take(limit) {
            let players: Vec<String> = card
                .select(&player_selector)
                .map(|p| p.text().collect::<String>().trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
            if players.len() < 2 {
                continue;
            }

            let tournament_name = text_of(&card, &tournament_selector).unwrap_or_else(|| "Unknown".to_string());
            let mut scraped = ScrapedMatch::new(Tour::Wta, &tournament_name, &players[0], &players[1]);
            scraped.date = Some(today.to_string());
            scraped.round = text_of(&card, &round_selector);
            scraped.score = text_of(&card, &score_selector);
            scraped.surface = Some("Hard".to_string());
            matches.push(scraped);
        }

        Ok(matches)
    }
}
