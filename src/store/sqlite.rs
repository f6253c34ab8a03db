use std::collections::{BTreeMap, BTreeSet};

use rusqlite::Connection;

use crate::db::{self, InsertTerm, TaxonomyRecord, TermRecord};

use super::errors::{StoreError, TermError};
use super::slug::{slugify, unique_slug};
use super::{validate_name, Taxonomy, Term, TermId, TermStore, ROOT};

pub struct SqliteTermStore {
    conn: Connection,
    deferred: bool,
    pending_recount: BTreeMap<String, BTreeSet<TermId>>,
}

impl SqliteTermStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self::from_connection(db::open_connection(path)?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            deferred: false,
            pending_recount: BTreeMap::new(),
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Creates the taxonomy or updates its hierarchical flag.
    pub fn register_taxonomy(
        &self,
        name: &str,
        hierarchical: bool,
    ) -> Result<Taxonomy, StoreError> {
        db::upsert_taxonomy(&self.conn, name, hierarchical)?;
        db::get_taxonomy(&self.conn, name)?
            .map(Taxonomy::from)
            .ok_or_else(|| StoreError::UnknownTaxonomy(name.to_string()))
    }

    pub fn list_taxonomies(&self) -> Result<Vec<Taxonomy>, StoreError> {
        Ok(db::list_taxonomies(&self.conn)?
            .into_iter()
            .map(Taxonomy::from)
            .collect())
    }

    pub fn list_terms(&self, taxonomy: &str) -> Result<Vec<Term>, StoreError> {
        if db::get_taxonomy(&self.conn, taxonomy)?.is_none() {
            return Err(StoreError::UnknownTaxonomy(taxonomy.to_string()));
        }
        Ok(db::list_terms(&self.conn, taxonomy)?
            .into_iter()
            .map(Term::from)
            .collect())
    }

    fn recount(&mut self, taxonomy: &str, parents: &[TermId]) -> Result<(), StoreError> {
        let updated = db::recount_children(&self.conn, taxonomy, parents)?;
        tracing::trace!(taxonomy, updated, "recounted child terms");
        Ok(())
    }
}

impl From<TaxonomyRecord> for Taxonomy {
    fn from(record: TaxonomyRecord) -> Self {
        Self {
            name: record.name,
            hierarchical: record.hierarchical,
            created_at: record.created_at,
        }
    }
}

impl From<TermRecord> for Term {
    fn from(record: TermRecord) -> Self {
        Self {
            id: record.term_id,
            name: record.name,
            slug: record.slug,
            taxonomy: record.taxonomy,
            parent_id: record.parent_id,
            child_count: record.child_count,
        }
    }
}

impl TermStore for SqliteTermStore {
    fn taxonomy_exists(&self, taxonomy: &str) -> Result<bool, StoreError> {
        Ok(db::get_taxonomy(&self.conn, taxonomy)?.is_some())
    }

    fn find_term(&self, name: &str, taxonomy: &str) -> Result<Option<Term>, StoreError> {
        Ok(db::find_term_by_name(&self.conn, taxonomy, name.trim())?.map(Term::from))
    }

    fn term_exists(
        &self,
        name: &str,
        taxonomy: &str,
        parent_id: TermId,
    ) -> Result<bool, StoreError> {
        Ok(db::term_exists(&self.conn, taxonomy, name.trim(), parent_id)?)
    }

    fn validate_create(
        &self,
        name: &str,
        taxonomy: &str,
        parent_id: TermId,
    ) -> Result<(), TermError> {
        let name = validate_name(name)?;
        let record = db::get_taxonomy(&self.conn, taxonomy)?
            .ok_or_else(|| StoreError::UnknownTaxonomy(taxonomy.to_string()))?;
        if parent_id != ROOT {
            if !record.hierarchical {
                return Err(TermError::NotHierarchical(taxonomy.to_string()));
            }
            if parent_id > ROOT && db::get_term(&self.conn, taxonomy, parent_id)?.is_none() {
                return Err(TermError::MissingParent(parent_id));
            }
        }
        if db::term_exists(&self.conn, taxonomy, name, parent_id)? {
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
        if parent_id < ROOT {
            return Err(TermError::MissingParent(parent_id));
        }
        self.validate_create(name, taxonomy, parent_id)?;
        let name = name.trim();

        let slug = unique_slug(&slugify(name), |candidate| {
            db::slug_exists(&self.conn, taxonomy, candidate)
        })?;
        let id = db::insert_term(
            &self.conn,
            &InsertTerm {
                taxonomy,
                name,
                slug: &slug,
                parent_id,
            },
        )?;
        tracing::debug!(taxonomy, name, id, parent_id, "inserted term");

        if parent_id != ROOT {
            if self.deferred {
                self.pending_recount
                    .entry(taxonomy.to_string())
                    .or_default()
                    .insert(parent_id);
            } else {
                self.recount(taxonomy, &[parent_id])?;
            }
        }

        Ok(Term {
            id,
            name: name.to_string(),
            slug,
            taxonomy: taxonomy.to_string(),
            parent_id,
            child_count: 0,
        })
    }

    fn defer_counting(&mut self, defer: bool) -> Result<(), StoreError> {
        self.deferred = defer;
        if defer {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending_recount);
        for (taxonomy, parents) in pending {
            let parents = parents.into_iter().collect::<Vec<_>>();
            self.recount(&taxonomy, &parents)?;
        }
        Ok(())
    }
}
