use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    Db(rusqlite::Error),
    UnknownTaxonomy(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Db(err) => write!(f, "database error: {}", err),
            StoreError::UnknownTaxonomy(name) => write!(f, "taxonomy '{}' does not exist", name),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Db(err) => Some(err),
            StoreError::UnknownTaxonomy(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}

/// Why a single term could not be created. Never fatal to an import run.
#[derive(Debug)]
pub enum TermError {
    EmptyName,
    NameTooLong(usize),
    MissingParent(i64),
    NotHierarchical(String),
    Duplicate { name: String, parent_id: i64 },
    Store(StoreError),
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermError::EmptyName => write!(f, "a term name cannot be empty"),
            TermError::NameTooLong(len) => write!(
                f,
                "term name is {} characters, the limit is {}",
                len,
                super::MAX_TERM_NAME_CHARS
            ),
            TermError::MissingParent(id) => write!(f, "parent term {} does not exist", id),
            TermError::NotHierarchical(taxonomy) => write!(
                f,
                "taxonomy '{}' is not hierarchical and cannot take a parent",
                taxonomy
            ),
            TermError::Duplicate { name, parent_id } => write!(
                f,
                "a term named '{}' already exists under parent {}",
                name, parent_id
            ),
            TermError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl Error for TermError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TermError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TermError {
    fn from(value: StoreError) -> Self {
        TermError::Store(value)
    }
}

impl From<rusqlite::Error> for TermError {
    fn from(value: rusqlite::Error) -> Self {
        TermError::Store(StoreError::Db(value))
    }
}
