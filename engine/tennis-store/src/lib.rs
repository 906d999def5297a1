//! Tennis Store
//!
//! Persistence for players, tournaments, matches, ranking snapshots and fantasy
//! season stats. [`PgStore`] is the production backend; [`MemoryStore`] keeps
//! the same key semantics in memory for tests and dry runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::Store;
