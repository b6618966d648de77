use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::CompositionRecord;

/// One lookup: the typed term plus the suggested fallbacks, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub primary_term: String,
    #[serde(default)]
    pub alternative_terms: Vec<String>,
}

impl SearchQuery {
    pub fn new(primary_term: impl Into<String>, alternative_terms: Vec<String>) -> Self {
        Self {
            primary_term: primary_term.into(),
            alternative_terms,
        }
    }

    /// Primary term first, then alternatives as supplied
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_term.as_str())
            .chain(self.alternative_terms.iter().map(String::as_str))
    }
}

/// Row returned to the caller for a hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub description: String,
    pub unit: String,
    pub unit_cost: BigDecimal,
}

impl From<&CompositionRecord> for MatchCandidate {
    fn from(record: &CompositionRecord) -> Self {
        Self {
            description: record.description.clone(),
            unit: record.unit.clone(),
            unit_cost: record.unit_cost.clone(),
        }
    }
}

/// Outcome of one cascade run. A miss is a normal value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    Found {
        matched_term: String,
        candidates: Vec<MatchCandidate>,
    },
    NotFound {
        attempted_term: String,
        alternatives_tried: usize,
    },
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found { .. })
    }

    pub fn candidates(&self) -> &[MatchCandidate] {
        match self {
            MatchResult::Found { candidates, .. } => candidates,
            MatchResult::NotFound { .. } => &[],
        }
    }

    /// Line shown next to the results
    pub fn status_message(&self) -> String {
        match self {
            MatchResult::Found { matched_term, .. } => format!("Found with: '{}'", matched_term),
            MatchResult::NotFound {
                attempted_term,
                alternatives_tried,
            } => format!(
                "Zero results for '{}' and {} alternatives.",
                attempted_term, alternatives_tried
            ),
        }
    }
}
