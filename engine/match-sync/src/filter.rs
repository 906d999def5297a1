//! Inclusion filter for live API events
//!
//! Keeps professional singles: ATP, WTA, Challenger and WTA 125 categories.
//! All checks are case-insensitive substring checks, so a tournament whose name
//! merely contains an excluded word ("Futures Cup") is dropped too.

use std::fmt;
use tennis_core::EventClassification;

const ALLOWED_CATEGORY_NAMES: [&str; 4] = ["atp", "wta", "challenger", "wta 125"];
const ALLOWED_CATEGORY_SLUGS: [&str; 4] = ["atp", "wta", "challenger", "wta-125"];
const EXCLUDED_KEYWORDS: [&str; 6] = ["itf", "junior", "youth", "futures", "u18", "u21"];

/// Why an event did not pass the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    Category(String),
    NotSingles,
    Doubles,
    ExcludedKeyword(&'static str),
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterReason::Category(category) => write!(f, "category '{}' is not a professional tour", category),
            FilterReason::NotSingles => write!(f, "not a singles event"),
            FilterReason::Doubles => write!(f, "doubles event"),
            FilterReason::ExcludedKeyword(keyword) => write!(f, "excluded keyword '{}'", keyword),
        }
    }
}

/// Check an event's classification; `Ok(())` means the event is kept.
pub fn check(classification: &EventClassification) -> Result<(), FilterReason> {
    let category_name = classification.category_name.trim().to_lowercase();
    let category_slug = classification.category_slug.trim().to_lowercase();
    let tournament_name = classification.tournament_name.to_lowercase();
    let season_name = classification.season_name.to_lowercase();

    if !ALLOWED_CATEGORY_NAMES.contains(&category_name.as_str())
        && !ALLOWED_CATEGORY_SLUGS.contains(&category_slug.as_str())
    {
        return Err(FilterReason::Category(classification.category_name.clone()));
    }

    if !classification.filter_categories.iter().any(|c| c.to_lowercase().contains("singles")) {
        return Err(FilterReason::NotSingles);
    }

    if tournament_name.contains("doubles") || season_name.contains("double") {
        return Err(FilterReason::Doubles);
    }

    for keyword in EXCLUDED_KEYWORDS {
        if [&category_name, &category_slug, &tournament_name, &season_name]
            .iter()
            .any(|field| field.contains(keyword))
        {
            return Err(FilterReason::ExcludedKeyword(keyword));
        }
    }

    Ok(())
}

pub fn is_included(classification: &EventClassification) -> bool {
    check(classification).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atp_singles(tournament: &str) -> EventClassification {
        EventClassification {
            category_name: "ATP".to_string(),
            category_slug: "atp".to_string(),
            tournament_name: tournament.to_string(),
            season_name: format!("ATP {} 2026", tournament),
            filter_categories: vec!["singles".to_string()],
        }
    }

    #[test]
    fn test_tour_singles_pass() {
        assert!(is_included(&atp_singles("Miami Open")));

        let mut challenger = atp_singles("Challenger Phoenix");
        challenger.category_name = "Challenger".to_string();
        challenger.category_slug = "challenger".to_string();
        assert!(is_included(&challenger));

        let mut wta125 = atp_singles("Antalya");
        wta125.category_name = "WTA 125".to_string();
        wta125.category_slug = "wta-125".to_string();
        assert!(is_included(&wta125));
    }

    #[test]
    fn test_slug_alone_is_enough() {
        let mut event = atp_singles("Doha");
        event.category_name = "Women".to_string();
        event.category_slug = "wta".to_string();
        assert!(is_included(&event));
    }

    #[test]
    fn test_itf_category_rejected() {
        let mut event = atp_singles("M25 Antalya");
        event.category_name = "ITF Men".to_string();
        event.category_slug = "itf-men".to_string();
        assert_eq!(check(&event), Err(FilterReason::Category("ITF Men".to_string())));
    }

    #[test]
    fn test_doubles_rejected() {
        let mut event = atp_singles("Miami Open");
        event.filter_categories = vec!["doubles".to_string()];
        assert_eq!(check(&event), Err(FilterReason::NotSingles));

        let event = atp_singles("Miami Open, Doubles");
        assert_eq!(check(&event), Err(FilterReason::Doubles));

        let mut event = atp_singles("Miami Open");
        event.season_name = "ATP Miami Double 2026".to_string();
        assert_eq!(check(&event), Err(FilterReason::Doubles));
    }

    #[test]
    fn test_excluded_keywords() {
        assert_eq!(
            check(&atp_singles("Junior Masters")),
            Err(FilterReason::ExcludedKeyword("junior"))
        );
        // Substring match: known false positive
        assert_eq!(
            check(&atp_singles("Futures Cup Invitational")),
            Err(FilterReason::ExcludedKeyword("futures"))
        );
    }

    #[test]
    fn test_case_insensitive() {
        let mut event = atp_singles("Miami Open");
        event.category_name = "atp".to_string();
        event.category_slug = "ATP".to_string();
        event.filter_categories = vec!["Singles".to_string()];
        assert!(is_included(&event));
    }
}
