pub mod cache;
pub mod normalize;
pub mod source;

pub use cache::{DatasetCache, LoadReport, LoaderOptions, SourceSignature};
pub use normalize::{build_dataset, parse_cost, parse_cost_text, ColumnLayout};
pub use source::{read_table, Cell, RawTable};

use thiserror::Error;

/// Why a composition sheet could not be turned into a dataset
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing expected column: {0}")]
    MissingColumn(String),
    #[error("Unsupported source format: '{0}'")]
    UnsupportedFormat(String),
    #[error("Source has no header row")]
    EmptySource,
}
