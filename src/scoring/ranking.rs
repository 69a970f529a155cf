// Post-scoring filters and top-N ranking.
//
// Filters are exact equality on niche and location; "All" disables a filter.
// Ranking is a stable sort by descending score, so ties keep input order.

use std::fmt;

use super::{ScoredCreator, ScoredDataset};

/// Default number of top matches to show.
pub const DEFAULT_TOP_COUNT: usize = 10;

/// Largest top count the front ends accept.
pub const MAX_TOP_COUNT: usize = 50;

/// Which creators to keep and how many to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFilter {
    /// `None` keeps every niche.
    pub niche: Option<String>,
    /// `None` keeps every location.
    pub location: Option<String>,
    pub top: usize,
}

impl Default for MatchFilter {
    fn default() -> Self {
        Self {
            niche: None,
            location: None,
            top: DEFAULT_TOP_COUNT,
        }
    }
}

impl MatchFilter {
    /// Interpret a user-facing selector: "All" (any case) or blank means no
    /// filter, anything else is matched exactly.
    pub fn selection(value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn keeps(&self, creator: &ScoredCreator) -> bool {
        let niche_ok = self
            .niche
            .as_deref()
            .is_none_or(|n| creator.record.niche == n);
        let location_ok = self
            .location
            .as_deref()
            .is_none_or(|l| creator.record.location == l);
        niche_ok && location_ok
    }
}

impl fmt::Display for MatchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "niche: {}, location: {}, top: {}",
            self.niche.as_deref().unwrap_or("All"),
            self.location.as_deref().unwrap_or("All"),
            self.top
        )
    }
}

impl ScoredDataset {
    /// Apply the filter, sort by descending score (stable) and keep the top N.
    pub fn select(&self, filter: &MatchFilter) -> Vec<&ScoredCreator> {
        let mut selected: Vec<&ScoredCreator> =
            self.creators().iter().filter(|c| filter.keeps(c)).collect();
        selected.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        selected.truncate(filter.top);
        selected
    }
}
