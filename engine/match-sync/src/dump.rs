//! Raw payload dumps and failed-record dumps

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tennis_core::{Result, SourceEvent};
use tracing::info;

/// A record that could not be synced, kept with its full source event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecord {
    pub event: SourceEvent,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDump {
    pub fetched_at: DateTime<Utc>,
    pub source: String,
    pub records: Vec<FailedRecord>,
}

pub fn failure_dump_name(at: DateTime<Utc>) -> String {
    format!("errors_{}.json", at.format("%Y%m%d_%H%M%S"))
}

pub fn raw_dump_name(date: NaiveDate) -> String {
    format!("matches_{}.json", date.format("%Y-%m-%d"))
}

/// Write failed records to `errors_<timestamp>.json`; nothing is written for an empty list.
pub async fn write_failure_dump(dir: &Path, source: &str, records: &[FailedRecord]) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        return Ok(None);
    }
    tokio::fs::create_dir_all(dir).await?;

    let fetched_at = Utc::now();
    let dump = FailureDump { fetched_at, source: source.to_string(), records: records.to_vec() };
    let path = dir.join(failure_dump_name(fetched_at));
    tokio::fs::write(&path, serde_json::to_string_pretty(&dump)?).await?;

    info!("💾 Saved {} failed records to {}", records.len(), path.display());
    Ok(Some(path))
}

pub async fn read_failure_dump(path: &Path) -> Result<FailureDump> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Store an unmodified API payload as `matches_<date>.json`
pub async fn write_raw_dump(dir: &Path, date: NaiveDate, payload: &serde_json::Value) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(raw_dump_name(date));
    tokio::fs::write(&path, serde_json::to_string_pretty(payload)?).await?;
    Ok(path)
}

/// Read any dump file back as plain JSON
pub async fn read_raw_dump(path: &Path) -> Result<serde_json::Value> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}
