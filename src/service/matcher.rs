use crate::models::{Dataset, MatchCandidate, MatchResult, SearchQuery};
use crate::service::tokenizer::tokenize;

/// Most rows a hit returns
pub const MAX_CANDIDATES: usize = 10;

/// First-success cascade over a query's terms.
///
/// Terms are tried primary first, then alternatives in order. A term whose
/// tokens all survive as literal substrings of at least one description ends
/// the search; later terms are never looked at. Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct MatchingEngine {
    limit: usize,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self {
            limit: MAX_CANDIDATES,
        }
    }
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self { limit: limit.max(1) }
    }

    pub fn match_query(&self, query: &SearchQuery, dataset: &Dataset) -> MatchResult {
        let mut alternatives_tried = 0usize;

        for (position, term) in query.terms().enumerate() {
            let tokens = tokenize(term);
            if tokens.is_empty() {
                tracing::debug!("Term '{}' has no searchable tokens, skipping", term);
                continue;
            }
            if position > 0 {
                alternatives_tried += 1;
            }

            let candidates: Vec<MatchCandidate> = dataset
                .scan(&tokens)
                .take(self.limit)
                .map(MatchCandidate::from)
                .collect();

            if !candidates.is_empty() {
                tracing::info!(
                    "Match for '{}' using term #{} '{}': {} rows",
                    query.primary_term,
                    position,
                    term,
                    candidates.len()
                );
                return MatchResult::Found {
                    matched_term: term.to_string(),
                    candidates,
                };
            }
            tracing::debug!("Term '{}' ({:?}) matched nothing", term, tokens);
        }

        tracing::info!(
            "No match for '{}' after {} alternatives",
            query.primary_term,
            alternatives_tried
        );
        MatchResult::NotFound {
            attempted_term: query.primary_term.clone(),
            alternatives_tried,
        }
    }
}

/// Runs the cascade with the default row limit
pub fn match_query(query: &SearchQuery, dataset: &Dataset) -> MatchResult {
    MatchingEngine::default().match_query(query, dataset)
}
