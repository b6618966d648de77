pub mod export;
pub mod extractor;
pub mod matcher;
pub mod session;
pub mod tokenizer;

pub use export::{budget_csv_bytes, export_to_csv, write_budget_csv};
pub use extractor::{parse_candidates, CandidateExtractor, ExtractError, Extraction};
pub use matcher::{match_query, MatchingEngine, MAX_CANDIDATES};
pub use session::{Session, SessionError};
pub use tokenizer::{tokenize, STOP_WORDS};
