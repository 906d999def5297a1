//! Error types shared by the ingestion pipeline

use crate::types::Tour;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, TennisError>;

/// Errors that can occur while fetching, resolving and persisting tennis data.
///
/// None of these abort a batch: the sync engine counts them per record and
/// carries on.
#[derive(Error, Debug)]
pub enum TennisError {
    #[error("Fetch failed for {unit}: {message}")]
    TransientFetch { unit: String, message: String },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Could not resolve player '{name}' ({tour}): {message}")]
    IdentityResolution { name: String, tour: Tour, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Aggregate recompute failed for {entity}: {message}")]
    AggregateRecompute { entity: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TennisError {
    pub fn fetch(unit: impl Into<String>, message: impl ToString) -> Self {
        TennisError::TransientFetch { unit: unit.into(), message: message.to_string() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        TennisError::MalformedRecord(message.into())
    }

    pub fn aggregate(entity: impl Into<String>, message: impl ToString) -> Self {
        TennisError::AggregateRecompute { entity: entity.into(), message: message.to_string() }
    }
}
