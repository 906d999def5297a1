//! Match Sync - canonical match records and idempotent synchronization
//!
//! [`MatchRecordBuilder`] turns decoded source events into canonical records;
//! [`SyncEngine`] persists them once per natural key and recomputes the
//! derived player and season aggregates.

pub mod aggregates;
pub mod builder;
pub mod dump;
pub mod engine;
pub mod filter;


pub use aggregates::{recompute, recompute_all, AggregateReport, RecomputeOptions};
pub use builder::{parse_match_date, MatchRecordBuilder, Rejection, UnknownRoundPolicy};
pub use dump::{read_failure_dump, read_raw_dump, write_failure_dump, write_raw_dump, FailedRecord, FailureDump};
pub use engine::{RecordOutcome, SyncConfig, SyncEngine, SyncSummary};
pub use filter::FilterReason;
