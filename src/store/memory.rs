use std::cell::Cell;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::errors::{StoreError, TermError};
use super::slug::{slugify, unique_slug};
use super::{validate_name, Term, TermId, TermStore, ROOT};

/// In-memory fake for loader tests. Names listed in `fail_on` make
/// `create_term` fail as if the backend had rejected them. Once
/// `fail_lookups_after` lookups have succeeded, further `find_term` and
/// `term_exists` calls fail with a database error.
#[derive(Debug, Default)]
pub struct MemoryTermStore {
    taxonomies: HashMap<String, bool>,
    terms: Vec<Term>,
    pub fail_on: HashSet<String>,
    pub fail_lookups_after: Option<usize>,
    lookups: Cell<usize>,
    pub create_calls: usize,
    pub recount_passes: usize,
    deferred: bool,
    pending: BTreeSet<(String, TermId)>,
}

impl MemoryTermStore {
    pub fn with_taxonomy(name: &str, hierarchical: bool) -> Self {
        let mut store = Self::default();
        store.taxonomies.insert(name.to_string(), hierarchical);
        store
    }

    pub fn add_taxonomy(&mut self, name: &str, hierarchical: bool) {
        self.taxonomies.insert(name.to_string(), hierarchical);
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// `(name, parent name)` pairs in creation order.
    pub fn tree(&self) -> Vec<(String, Option<String>)> {
        self.terms
            .iter()
            .map(|term| {
                let parent = self
                    .terms
                    .iter()
                    .find(|candidate| candidate.id == term.parent_id)
                    .map(|parent| parent.name.clone());
                (term.name.clone(), parent)
            })
            .collect()
    }

    fn lookup(&self) -> Result<(), StoreError> {
        let done = self.lookups.get();
        if self.fail_lookups_after.is_some_and(|limit| done >= limit) {
            return Err(StoreError::Db(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_IOERR),
                Some("disk I/O error".to_string()),
            )));
        }
        self.lookups.set(done + 1);
        Ok(())
    }

    fn has_term(&self, name: &str, taxonomy: &str, parent_id: TermId) -> bool {
        let name = name.trim();
        self.terms.iter().any(|term| {
            term.taxonomy == taxonomy && term.name == name && term.parent_id == parent_id
        })
    }

    fn recount(&mut self, taxonomy: &str, parent_id: TermId) {
        let count = self
            .terms
            .iter()
            .filter(|term| term.taxonomy == taxonomy && term.parent_id == parent_id)
            .count() as i64;
        if let Some(parent) = self
            .terms
            .iter_mut()
            .find(|term| term.taxonomy == taxonomy && term.id == parent_id)
        {
            parent.child_count = count;
        }
    }
}

impl TermStore for MemoryTermStore {
    fn taxonomy_exists(&self, taxonomy: &str) -> Result<bool, StoreError> {
        Ok(self.taxonomies.contains_key(taxonomy))
    }

    fn find_term(&self, name: &str, taxonomy: &str) -> Result<Option<Term>, StoreError> {
        self.lookup()?;
        let name = name.trim();
        Ok(self
            .terms
            .iter()
            .find(|term| term.taxonomy == taxonomy && term.name == name)
            .cloned())
    }

    fn term_exists(
        &self,
        name: &str,
        taxonomy: &str,
        parent_id: TermId,
    ) -> Result<bool, StoreError> {
        self.lookup()?;
        Ok(self.has_term(name, taxonomy, parent_id))
    }

    fn validate_create(
        &self,
        name: &str,
        taxonomy: &str,
        parent_id: TermId,
    ) -> Result<(), TermError> {
        let name = validate_name(name)?;
        let hierarchical = *self
            .taxonomies
            .get(taxonomy)
            .ok_or_else(|| StoreError::UnknownTaxonomy(taxonomy.to_string()))?;
        if parent_id != ROOT {
            if !hierarchical {
                return Err(TermError::NotHierarchical(taxonomy.to_string()));
            }
            let parent_known = self
                .terms
                .iter()
                .any(|term| term.taxonomy == taxonomy && term.id == parent_id);
            if parent_id > ROOT && !parent_known {
                return Err(TermError::MissingParent(parent_id));
            }
        }
        if self.has_term(name, taxonomy, parent_id) {
            return Err(TermError::Duplicate {
                name: name.to_string(),
                parent_id,
            });
        }
        Ok(())
    }

    fn create_term(
        &mut self,
        name: &str,
        taxonomy: &str,
        parent_id: TermId,
    ) -> Result<Term, TermError> {
        self.create_calls += 1;
        if parent_id < ROOT {
            return Err(TermError::MissingParent(parent_id));
        }
        self.validate_create(name, taxonomy, parent_id)?;
        let name = name.trim();
        if self.fail_on.contains(name) {
            return Err(TermError::Duplicate {
                name: name.to_string(),
                parent_id,
            });
        }

        let slug = unique_slug(&slugify(name), |candidate| {
            Ok::<_, StoreError>(
                self.terms
                    .iter()
                    .any(|term| term.taxonomy == taxonomy && term.slug == candidate),
            )
        })?;
        let term = Term {
            id: self.terms.len() as TermId + 1,
            name: name.to_string(),
            slug,
            taxonomy: taxonomy.to_string(),
            parent_id,
            child_count: 0,
        };
        self.terms.push(term.clone());

        if parent_id != ROOT {
            if self.deferred {
                self.pending.insert((taxonomy.to_string(), parent_id));
            } else {
                self.recount(taxonomy, parent_id);
            }
        }
        Ok(term)
    }

    fn defer_counting(&mut self, defer: bool) -> Result<(), StoreError> {
        self.deferred = defer;
        if !defer {
            let pending = std::mem::take(&mut self.pending);
            if !pending.is_empty() {
                self.recount_passes += 1;
            }
            for (taxonomy, parent_id) in pending {
                self.recount(&taxonomy, parent_id);
            }
        }
        Ok(())
    }
}
