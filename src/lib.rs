pub mod api;
pub mod config;
pub mod loader;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use loader::{DatasetCache, LoadReport, LoaderOptions};
pub use models::{CompositionRecord, Dataset, MatchResult, SearchQuery};
pub use service::{match_query, CandidateExtractor, MatchingEngine, Session};
