pub mod budget;
pub mod candidate;
pub mod composition;
pub mod query;

pub use budget::{decimal_comma, decimal_from_f64, format_brl, BudgetLedger, BudgetLine};
pub use candidate::ServiceCandidate;
pub use composition::{CompositionRecord, Dataset};
pub use query::{MatchCandidate, MatchResult, SearchQuery};
