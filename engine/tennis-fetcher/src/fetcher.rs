use crate::config::ApiConfig;
use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration as StdDuration;
use tennis_core::Tour;
use tracing::info;

/// Client for the live tennis events and rankings API
pub struct LiveApiClient {
    config: ApiConfig,
    api_key: String,
    client: Client,
}

impl LiveApiClient {
    /// Create a new client
    pub fn new(config: ApiConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, api_key, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// URL of the events listing for one day
    pub fn events_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/api/tennis/events/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            date.day(),
            date.month(),
            date.year()
        )
    }

    pub fn rankings_url(&self, tour: Tour) -> String {
        format!(
            "{}/api/tennis/rankings/{}",
            self.config.base_url.trim_end_matches('/'),
            tour.ranking_type()
        )
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.config.host)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("API request failed with status: {}", response.status());
        }

        response.json().await.with_context(|| format!("Failed to parse JSON from {}", url))
    }

    /// Fetch the unmodified events payload of one day
    pub async fn fetch_events(&self, date: NaiveDate) -> Result<Value> {
        let url = self.events_url(date);
        info!("Fetching events for {} from: {}", date, url);

        let payload = self.get_json(&url).await?;
        let count = payload.get("events").and_then(Value::as_array).map_or(0, Vec::len);
        info!("Successfully fetched {} events for {}", count, date);
        Ok(payload)
    }

    /// Fetch the unmodified rankings table of one tour
    pub async fn fetch_rankings(&self, tour: Tour) -> Result<Value> {
        let url = self.rankings_url(tour);
        info!("Fetching {} rankings from: {}", tour, url);

        let payload = self.get_json(&url).await?;
        let count = payload.get("rankings").and_then(Value::as_array).map_or(0, Vec::len);
        info!("Successfully fetched {} {} ranking rows", count, tour);
        Ok(payload)
    }

    /// Days to fetch around `today`, oldest first
    pub fn fetch_window(&self, today: NaiveDate) -> Vec<NaiveDate> {
        fetch_window(today, self.config.days_back, self.config.days_forward)
    }
}

/// `today - days_back ..= today + days_forward`
pub fn fetch_window(today: NaiveDate, days_back: i64, days_forward: i64) -> Vec<NaiveDate> {
    (-days_back..=days_forward).map(|offset| today + Duration::days(offset)).collect()
}
