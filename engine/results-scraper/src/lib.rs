//! Results Scraper - best-effort ATP/WTA results pages
//!
//! Reads the public results pages and emits [`tennis_core::SourceEvent`]s of the
//! scraped-results schema. The winner is always listed first.

pub mod scraper;
pub mod types;

pub use crate::scraper::{ResultsScraper, ScraperConfig};
pub use crate::types::{ScrapedMatch, ScrapedResults};
