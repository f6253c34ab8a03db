//! Term storage. The loader only talks to [`TermStore`]; the SQLite store is
//! the concrete backend used by the CLI.

mod errors;
#[cfg(test)]
pub mod memory;
mod slug;
mod sqlite;

use serde::Serialize;

pub use errors::{StoreError, TermError};
pub use sqlite::SqliteTermStore;

pub type TermId = i64;

/// Parent id of a top-level term.
pub const ROOT: TermId = 0;

pub const MAX_TERM_NAME_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Term {
    pub id: TermId,
    pub name: String,
    pub slug: String,
    pub taxonomy: String,
    pub parent_id: TermId,
    pub child_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Taxonomy {
    pub name: String,
    pub hierarchical: bool,
    pub created_at: String,
}

pub trait TermStore {
    fn taxonomy_exists(&self, taxonomy: &str) -> Result<bool, StoreError>;

    /// Name-only lookup: any term called `name` in `taxonomy`, whatever its
    /// parent. When several match the oldest one is returned.
    fn find_term(&self, name: &str, taxonomy: &str) -> Result<Option<Term>, StoreError>;

    fn term_exists(&self, name: &str, taxonomy: &str, parent_id: TermId)
        -> Result<bool, StoreError>;

    /// Every check `create_term` makes, without writing anything. Parent ids
    /// below [`ROOT`] stand for terms planned by a dry run and are accepted
    /// as existing parents.
    fn validate_create(
        &self,
        name: &str,
        taxonomy: &str,
        parent_id: TermId,
    ) -> Result<(), TermError>;

    fn create_term(
        &mut self,
        name: &str,
        taxonomy: &str,
        parent_id: TermId,
    ) -> Result<Term, TermError>;

    /// While deferred, child counts are not maintained on create. Turning
    /// deferral off recounts every parent touched in the meantime.
    fn defer_counting(&mut self, defer: bool) -> Result<(), StoreError>;
}

pub(crate) fn validate_name(raw: &str) -> Result<&str, TermError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(TermError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_TERM_NAME_CHARS {
        return Err(TermError::NameTooLong(len));
    }
    Ok(name)
}
