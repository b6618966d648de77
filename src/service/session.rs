use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    decimal_from_f64, BudgetLedger, BudgetLine, Dataset, MatchResult, ServiceCandidate,
};
use crate::service::MatchingEngine;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No pending service to work on")]
    NoPendingService,
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Run a search with results before adding a composition")]
    NoSearchResult,
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
}

/// Working state of one estimator: the services left on the current page,
/// which one is being priced, the last search, and the budget built so far.
///
/// Every transition borrows the current state and returns the next one, so a
/// rejected transition leaves the caller's state untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    page: Option<u32>,
    pending: Vec<ServiceCandidate>,
    selected: usize,
    last_search: Option<MatchResult>,
    ledger: BudgetLedger,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) -> Option<u32> {
        self.page
    }

    pub fn pending(&self) -> &[ServiceCandidate] {
        &self.pending
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&ServiceCandidate> {
        self.pending.get(self.selected)
    }

    pub fn last_search(&self) -> Option<&MatchResult> {
        self.last_search.as_ref()
    }

    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    /// A page was processed and nothing is left in its queue
    pub fn is_page_done(&self) -> bool {
        self.page.is_some() && self.pending.is_empty()
    }

    /// Replaces the queue with the services found on `page`
    pub fn load_page(&self, page: u32, candidates: Vec<ServiceCandidate>) -> Session {
        Session {
            page: Some(page),
            pending: candidates,
            selected: 0,
            last_search: None,
            ledger: self.ledger.clone(),
        }
    }

    pub fn select(&self, index: usize) -> Result<Session, SessionError> {
        if index >= self.pending.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.pending.len(),
            });
        }
        let mut next = self.clone();
        next.selected = index;
        next.last_search = None;
        Ok(next)
    }

    /// Searches for the selected service. A non-blank `term` replaces the
    /// suggested primary term; the suggested alternatives are always kept.
    pub fn search(
        &self,
        term: Option<&str>,
        engine: &MatchingEngine,
        dataset: &Dataset,
    ) -> Result<Session, SessionError> {
        let service = self.selected().ok_or(SessionError::NoPendingService)?;
        let mut query = service.search_query();
        if let Some(term) = term.filter(|t| !t.trim().is_empty()) {
            query.primary_term = term.to_string();
        }

        let result = engine.match_query(&query, dataset);
        let mut next = self.clone();
        next.last_search = Some(result);
        Ok(next)
    }

    /// Adds one of the last search's rows to the budget and retires the
    /// selected service. `quantity` defaults to the extracted estimate.
    pub fn accept(
        &self,
        candidate_index: usize,
        quantity: Option<BigDecimal>,
    ) -> Result<Session, SessionError> {
        let service = self.selected().ok_or(SessionError::NoPendingService)?;
        let candidates = match &self.last_search {
            Some(result @ MatchResult::Found { .. }) => result.candidates(),
            _ => return Err(SessionError::NoSearchResult),
        };
        let candidate = candidates
            .get(candidate_index)
            .ok_or(SessionError::IndexOutOfRange {
                index: candidate_index,
                len: candidates.len(),
            })?;

        let quantity = match quantity {
            Some(q) => q,
            None => decimal_from_f64(service.quantity())
                .ok_or_else(|| SessionError::InvalidQuantity(service.quantity().to_string()))?,
        };
        if quantity < BigDecimal::zero() {
            return Err(SessionError::InvalidQuantity(quantity.to_string()));
        }

        let line = BudgetLine::new(self.page, service.original_text.clone(), candidate, quantity);
        tracing::info!(
            "Budget line added: '{}' -> '{}' ({} x {})",
            line.original_service_text,
            line.matched_description,
            line.quantity,
            line.unit_cost
        );

        let mut next = self.without_selected();
        next.ledger.push(line);
        Ok(next)
    }

    /// Drops the selected service without pricing it
    pub fn skip(&self) -> Result<Session, SessionError> {
        let service = self.selected().ok_or(SessionError::NoPendingService)?;
        tracing::info!("Service skipped: '{}'", service.original_text);
        Ok(self.without_selected())
    }

    pub fn remove_line(&self, index: usize) -> Result<Session, SessionError> {
        let mut next = self.clone();
        let len = next.ledger.len();
        next.ledger
            .remove(index)
            .ok_or(SessionError::IndexOutOfRange { index, len })?;
        Ok(next)
    }

    pub fn clear_budget(&self) -> Session {
        let mut next = self.clone();
        next.ledger.clear();
        next
    }

    fn without_selected(&self) -> Session {
        let mut next = self.clone();
        next.pending.remove(self.selected);
        next.selected = self.selected.min(next.pending.len().saturating_sub(1));
        next.last_search = None;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompositionRecord;
    use std::str::FromStr;

    fn service(original: &str, primary: &str, alternatives: &[&str], quantity: f64) -> ServiceCandidate {
        ServiceCandidate {
            original_text: original.into(),
            primary_term: Some(primary.into()),
            alternative_terms: alternatives.iter().map(|s| s.to_string()).collect(),
            quantity: Some(quantity),
            unit: Some("m2".into()),
            note: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            CompositionRecord::new("REMOÇÃO DE PISO CERÂMICO", "m2", BigDecimal::from_str("12.50").unwrap()),
            CompositionRecord::new("PINTURA ACRÍLICA EM PAREDE", "m2", BigDecimal::from_str("20.00").unwrap()),
        ])
    }

    fn loaded() -> Session {
        Session::new().load_page(
            2,
            vec![
                service("Demolir piso", "DEMOLIÇÃO DE PISO", &["REMOÇÃO DE PISO"], 4.0),
                service("Pintar parede", "PINTURA ACRÍLICA", &[], 10.0),
            ],
        )
    }

    #[test]
    fn search_accept_moves_service_into_budget() {
        let engine = MatchingEngine::default();
        let s = loaded().search(None, &engine, &dataset()).unwrap();
        assert!(s.last_search().unwrap().is_found());

        let s = s.accept(0, None).unwrap();
        assert_eq!(s.pending().len(), 1);
        assert_eq!(s.selected().unwrap().original_text, "Pintar parede");
        assert!(s.last_search().is_none());

        let line = &s.ledger().lines()[0];
        assert_eq!(line.page, Some(2));
        assert_eq!(line.matched_description, "REMOÇÃO DE PISO CERÂMICO");
        assert_eq!(line.total, BigDecimal::from(50));
    }

    #[test]
    fn term_override_replaces_primary_only() {
        let engine = MatchingEngine::default();
        let s = loaded()
            .search(Some("TELHADO COLONIAL"), &engine, &dataset())
            .unwrap();
        // override misses, the suggested alternative still hits
        match s.last_search().unwrap() {
            MatchResult::Found { matched_term, .. } => assert_eq!(matched_term, "REMOÇÃO DE PISO"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn accept_requires_a_hit() {
        let s = loaded();
        assert_eq!(s.accept(0, None), Err(SessionError::NoSearchResult));

        let engine = MatchingEngine::default();
        let s = s.select(1).unwrap().search(Some("ESCADA"), &engine, &dataset()).unwrap();
        assert!(!s.last_search().unwrap().is_found());
        assert_eq!(s.accept(0, None), Err(SessionError::NoSearchResult));
    }

    #[test]
    fn rejected_transitions_report_errors() {
        let engine = MatchingEngine::default();
        let s = loaded().search(None, &engine, &dataset()).unwrap();
        assert_eq!(
            s.accept(5, None),
            Err(SessionError::IndexOutOfRange { index: 5, len: 1 })
        );
        assert!(matches!(
            s.accept(0, Some(BigDecimal::from(-1))),
            Err(SessionError::InvalidQuantity(_))
        ));
        assert_eq!(
            loaded().select(9),
            Err(SessionError::IndexOutOfRange { index: 9, len: 2 })
        );
        assert_eq!(Session::new().skip(), Err(SessionError::NoPendingService));
    }

    #[test]
    fn skipping_last_item_finishes_page() {
        let s = loaded().select(1).unwrap().skip().unwrap();
        assert_eq!(s.selected_index(), 0);
        let s = s.skip().unwrap();
        assert!(s.is_page_done());
        assert!(s.ledger().is_empty());
        assert!(!Session::new().is_page_done());
    }

    #[test]
    fn ledger_survives_new_page_and_can_be_edited() {
        let engine = MatchingEngine::default();
        let s = loaded()
            .search(None, &engine, &dataset())
            .unwrap()
            .accept(0, Some(BigDecimal::from(2)))
            .unwrap();
        let s = s.load_page(3, vec![]);
        assert_eq!(s.ledger().len(), 1);
        assert_eq!(s.ledger().total(), BigDecimal::from(25));

        assert!(s.remove_line(4).is_err());
        assert!(s.remove_line(0).unwrap().ledger().is_empty());
        assert!(s.clear_budget().ledger().is_empty());
    }
}
