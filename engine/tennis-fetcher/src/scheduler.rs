use crate::config::SchedulerConfig;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, Utc};
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

/// Runs the pipeline once a day at a fixed UTC time
pub struct FetcherScheduler {
    pipeline: Pipeline,
    run_time: NaiveTime,
    run_at_startup: bool,
}

impl FetcherScheduler {
    /// Create a new scheduler
    pub fn new(pipeline: Pipeline, config: &SchedulerConfig) -> Result<Self> {
        let run_time = NaiveTime::parse_from_str(&config.daily_run_time, "%H:%M")
            .with_context(|| format!("Invalid daily run time: {}", config.daily_run_time))?;

        Ok(Self { pipeline, run_time, run_at_startup: config.run_at_startup })
    }

    /// Start the scheduler (runs indefinitely)
    pub async fn start(&self) -> Result<()> {
        info!("Starting tennis sync scheduler (daily at {} UTC)", self.run_time.format("%H:%M"));

        if self.run_at_startup {
            self.run().await;
        }

        loop {
            let now = Utc::now();
            let next_run = calculate_next_run_time(now, self.run_time);
            let sleep_duration = (next_run - now).to_std().unwrap_or(Duration::from_secs(60));

            info!("Next sync scheduled for: {}", next_run);
            sleep(sleep_duration).await;

            self.run().await;
        }
    }

    /// One pass; failures are already logged per unit and the next slot runs regardless
    async fn run(&self) {
        let report = self.pipeline.run_once(Utc::now().date_naive()).await;
        info!("Scheduled sync completed: {} records processed", report.matches.total());
    }
}

/// Next occurrence of `run_time` strictly after `now`
pub fn calculate_next_run_time(now: DateTime<Utc>, run_time: NaiveTime) -> DateTime<Utc> {
    let today_run = now.date_naive().and_time(run_time).and_utc();

    if today_run > now {
        today_run
    } else {
        // Tomorrow's run time
        (now.date_naive() + chrono::Duration::days(1)).and_time(run_time).and_utc()
    }
}
