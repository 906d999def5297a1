use anyhow::Result;
use results_scraper::{ResultsScraper, ScraperConfig};
use std::fs;
use tokio::time::{sleep, Duration};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting ATP/WTA results scraper...");

    let config = ScraperConfig::default();
    let delay = Duration::from_millis(config.courtesy_delay_ms);
    let scraper = ResultsScraper::new(config)?;

    let atp = scraper.scrape_atp().await?;
    sleep(delay).await;
    let wta = scraper.scrape_wta().await?;

    fs::create_dir_all("data/results")?;

    let date = atp.scraped_at.format("%Y-%m-%d");
    for results in [&atp, &wta] {
        let json_path = format!("data/results/{}_{}.json", results.tour.as_str().to_lowercase(), date);
        fs::write(&json_path, serde_json::to_string_pretty(results)?)?;
        info!("Saved {} {} matches to {}", results.matches.len(), results.tour, json_path);
    }

    println!("\nScraped results:");
    println!("{:<4} {:<28} {:<16} {:<24} {:<24}", "Tour", "Tournament", "Round", "Winner", "Loser");
    println!("{}", "-".repeat(100));
    for m in atp.matches.iter().chain(wta.matches.iter()) {
        println!(
            "{:<4} {:<28} {:<16} {:<24} {:<24}",
            m.tour.as_str(),
            m.tournament_name,
            m.round.as_deref().unwrap_or("-"),
            m.winner_name,
            m.loser_name
        );
    }

    info!("Scraping completed successfully!");
    Ok(())
}
