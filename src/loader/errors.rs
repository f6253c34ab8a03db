use std::error::Error;
use std::fmt;

use crate::store::StoreError;

use super::service::ImportSummary;

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Csv(csv::Error),
    Store(StoreError),
    InvalidTaxonomy(String),
    MissingInput(String),
    InvalidDelimiter(String),
    AmbiguousParents(usize),
    /// A store failure after the run started. The partial summary is kept so
    /// the caller can still record the run.
    Aborted {
        summary: Box<ImportSummary>,
        source: StoreError,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(err) => write!(f, "I/O error: {}", err),
            LoadError::Csv(err) => write!(f, "{}", err),
            LoadError::Store(err) => write!(f, "{}", err),
            LoadError::InvalidTaxonomy(name) => write!(
                f,
                "the taxonomy '{}' does not exist, please use a taxonomy that does exist",
                name
            ),
            LoadError::MissingInput(message) => write!(f, "{}", message),
            LoadError::InvalidDelimiter(raw) => write!(
                f,
                "invalid delimiter '{}', expected a single ASCII character",
                raw
            ),
            LoadError::AmbiguousParents(count) => write!(
                f,
                "{} ambiguous parent name(s) found, refusing to import (run `migrant check`)",
                count
            ),
            LoadError::Aborted { summary, source } => write!(
                f,
                "import aborted after {} row(s): {}",
                summary.row_count, source
            ),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            LoadError::Csv(err) => Some(err),
            LoadError::Store(err) => Some(err),
            LoadError::Aborted { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(value: std::io::Error) -> Self {
        LoadError::Io(value)
    }
}

impl From<csv::Error> for LoadError {
    fn from(value: csv::Error) -> Self {
        LoadError::Csv(value)
    }
}

impl From<StoreError> for LoadError {
    fn from(value: StoreError) -> Self {
        LoadError::Store(value)
    }
}
