use serde::Serialize;
use uuid::Uuid;

use crate::db::now_utc_rfc3339;
use crate::store::{StoreError, TermId, TermStore, ROOT};

use super::ancestry::{find_ambiguous_parents, nearest_ancestor, AmbiguousParent};
use super::errors::LoadError;
use super::source::{read_rows, require_input, sha256_file, CsvRows, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub delimiter: u8,
    /// Refuse to import when any parent name is ambiguous.
    pub strict: bool,
    pub dry_run: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            strict: false,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub run_id: String,
    pub taxonomy: String,
    pub source_ref: String,
    pub source_sha256: String,
    pub status: String,
    pub row_count: u64,
    pub processed_count: u64,
    pub created_count: u64,
    pub skipped_count: u64,
    pub failed_count: u64,
    pub orphaned_count: u64,
    pub last_error: Option<String>,
    pub dry_run: bool,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermStatus {
    Created(TermId),
    /// Dry run: the term would have been created.
    Planned,
    Exists,
    Failed(String),
}

/// What happened to one non-empty cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEvent {
    pub row: usize,
    pub column: usize,
    pub name: String,
    pub parent: Option<String>,
    pub parent_id: TermId,
    /// False when `parent` was named but no such term could be found, in
    /// which case the term lands at the top level.
    pub parent_found: bool,
    pub status: TermStatus,
}

#[derive(Debug)]
struct ImportRun {
    run_id: String,
    started_at: String,
    row_count: u64,
    processed_count: u64,
    created_count: u64,
    skipped_count: u64,
    failed_count: u64,
    orphaned_count: u64,
    last_error: Option<String>,
    /// Dry-run creations as `(name, parent_id, synthetic id)`.
    planned: Vec<(String, TermId, TermId)>,
}

impl ImportRun {
    fn new() -> Self {
        Self {
            run_id: Uuid::now_v7().to_string(),
            started_at: now_utc_rfc3339(),
            row_count: 0,
            processed_count: 0,
            created_count: 0,
            skipped_count: 0,
            failed_count: 0,
            orphaned_count: 0,
            last_error: None,
            planned: Vec::new(),
        }
    }

    fn plan(&mut self, name: &str, parent_id: TermId) {
        let synthetic = -(self.planned.len() as TermId) - 1;
        self.planned.push((name.to_string(), parent_id, synthetic));
    }

    fn planned_id(&self, name: &str) -> Option<TermId> {
        self.planned
            .iter()
            .find(|(planned, _, _)| planned == name)
            .map(|(_, _, id)| *id)
    }

    fn is_planned(&self, name: &str, parent_id: TermId) -> bool {
        self.planned
            .iter()
            .any(|(planned, parent, _)| planned == name && *parent == parent_id)
    }
}

/// Imports spreadsheet rows as terms, resolving each cell's parent from the
/// nearest non-empty cell to its left.
///
/// Parents are looked up by name only, so a name that exists under several
/// parents resolves to the oldest such term. A parent that cannot be found
/// yields a top-level term. Both behaviours are reported per cell; use
/// [`TermLoader::check_file`] or `strict` to catch them up front.
pub struct TermLoader<'a, S: TermStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: TermStore + ?Sized> TermLoader<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn import_file(
        &mut self,
        taxonomy: &str,
        file: Option<&str>,
        options: &ImportOptions,
        on_event: &mut dyn FnMut(&TermEvent),
    ) -> Result<ImportSummary, LoadError> {
        let source_ref = require_input(file)?;
        self.ensure_taxonomy(taxonomy)?;
        let source_sha256 = sha256_file(&source_ref)?;

        if options.strict {
            let rows = read_rows(&source_ref, options.delimiter)?;
            let ambiguous = find_ambiguous_parents(&*self.store, taxonomy, &rows)?;
            if !ambiguous.is_empty() {
                return Err(LoadError::AmbiguousParents(ambiguous.len()));
            }
            return self.import_rows(
                taxonomy,
                &source_ref,
                &source_sha256,
                rows,
                options.dry_run,
                on_event,
            );
        }

        let rows = CsvRows::open(&source_ref, options.delimiter)?;
        self.import_rows(
            taxonomy,
            &source_ref,
            &source_sha256,
            rows,
            options.dry_run,
            on_event,
        )
    }

    pub fn check_file(
        &self,
        taxonomy: &str,
        file: Option<&str>,
        delimiter: u8,
    ) -> Result<Vec<AmbiguousParent>, LoadError> {
        let source_ref = require_input(file)?;
        self.ensure_taxonomy(taxonomy)?;
        let rows = read_rows(&source_ref, delimiter)?;
        Ok(find_ambiguous_parents(&*self.store, taxonomy, &rows)?)
    }

    pub fn import_rows<I>(
        &mut self,
        taxonomy: &str,
        source_ref: &str,
        source_sha256: &str,
        rows: I,
        dry_run: bool,
        on_event: &mut dyn FnMut(&TermEvent),
    ) -> Result<ImportSummary, LoadError>
    where
        I: IntoIterator<Item = Result<Row, LoadError>>,
    {
        self.ensure_taxonomy(taxonomy)?;
        let mut run = ImportRun::new();
        tracing::info!(run_id = %run.run_id, taxonomy, source_ref, dry_run, "starting term import");

        if !dry_run {
            self.store.defer_counting(true)?;
        }
        let outcome = self.process_rows(taxonomy, rows, dry_run, &mut run, on_event);
        let released = if dry_run {
            Ok(())
        } else {
            self.store.defer_counting(false)
        };

        let failure = match (outcome, released) {
            (Err(err), _) | (Ok(()), Err(err)) => Some(err),
            (Ok(()), Ok(())) => None,
        };
        let status = if failure.is_some() {
            "failed"
        } else if dry_run {
            "dry_run"
        } else if run.failed_count > 0 {
            "partial"
        } else {
            "completed"
        };
        if let Some(err) = &failure {
            run.last_error = Some(err.to_string());
        }

        let summary = ImportSummary {
            run_id: run.run_id,
            taxonomy: taxonomy.to_string(),
            source_ref: source_ref.to_string(),
            source_sha256: source_sha256.to_string(),
            status: status.to_string(),
            row_count: run.row_count,
            processed_count: run.processed_count,
            created_count: run.created_count,
            skipped_count: run.skipped_count,
            failed_count: run.failed_count,
            orphaned_count: run.orphaned_count,
            last_error: run.last_error,
            dry_run,
            started_at: run.started_at,
            finished_at: now_utc_rfc3339(),
        };
        tracing::info!(
            run_id = %summary.run_id,
            status = %summary.status,
            created = summary.created_count,
            "term import finished"
        );

        match failure {
            Some(source) => Err(LoadError::Aborted {
                summary: Box::new(summary),
                source,
            }),
            None => Ok(summary),
        }
    }

    fn ensure_taxonomy(&self, taxonomy: &str) -> Result<(), LoadError> {
        if taxonomy.trim().is_empty() || !self.store.taxonomy_exists(taxonomy)? {
            return Err(LoadError::InvalidTaxonomy(taxonomy.to_string()));
        }
        Ok(())
    }

    fn process_rows<I>(
        &mut self,
        taxonomy: &str,
        rows: I,
        dry_run: bool,
        run: &mut ImportRun,
        on_event: &mut dyn FnMut(&TermEvent),
    ) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = Result<Row, LoadError>>,
    {
        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            run.row_count += 1;
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    run.failed_count += 1;
                    run.last_error = Some(format!("row {}: {}", row_number, err));
                    tracing::warn!(row = row_number, error = %err, "skipping unreadable row");
                    continue;
                }
            };

            for (column, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                run.processed_count += 1;
                let event = self.import_cell(taxonomy, &row, row_number, column, dry_run, run)?;
                match &event.status {
                    TermStatus::Created(_) | TermStatus::Planned => run.created_count += 1,
                    TermStatus::Exists => run.skipped_count += 1,
                    TermStatus::Failed(message) => {
                        run.failed_count += 1;
                        run.last_error = Some(format!(
                            "row {} column {}: {}",
                            row_number,
                            column + 1,
                            message
                        ));
                    }
                }
                if !event.parent_found {
                    run.orphaned_count += 1;
                }
                on_event(&event);
            }
        }
        Ok(())
    }

    fn import_cell(
        &mut self,
        taxonomy: &str,
        row: &[String],
        row_number: usize,
        column: usize,
        dry_run: bool,
        run: &mut ImportRun,
    ) -> Result<TermEvent, StoreError> {
        let name = row[column].as_str();
        let parent = nearest_ancestor(row, column);

        let (parent_id, parent_found) = match parent {
            None => (ROOT, true),
            Some(parent_name) => match self.resolve_parent(parent_name, taxonomy, run)? {
                Some(id) => (id, true),
                None => (ROOT, false),
            },
        };

        let exists = self.store.term_exists(name, taxonomy, parent_id)?
            || (dry_run && run.is_planned(name, parent_id));
        let status = if exists {
            TermStatus::Exists
        } else if dry_run {
            match self.store.validate_create(name, taxonomy, parent_id) {
                Ok(()) => {
                    run.plan(name, parent_id);
                    TermStatus::Planned
                }
                Err(err) => TermStatus::Failed(err.to_string()),
            }
        } else {
            match self.store.create_term(name, taxonomy, parent_id) {
                Ok(term) => TermStatus::Created(term.id),
                Err(err) => TermStatus::Failed(err.to_string()),
            }
        };
        tracing::debug!(
            row = row_number,
            column,
            name,
            parent_id,
            ?status,
            "processed cell"
        );

        Ok(TermEvent {
            row: row_number,
            column,
            name: name.to_string(),
            parent: parent.map(str::to_string),
            parent_id,
            parent_found,
            status,
        })
    }

    fn resolve_parent(
        &self,
        parent_name: &str,
        taxonomy: &str,
        run: &ImportRun,
    ) -> Result<Option<TermId>, StoreError> {
        if let Some(term) = self.store.find_term(parent_name, taxonomy)? {
            return Ok(Some(term.id));
        }
        Ok(run.planned_id(parent_name))
    }
}
