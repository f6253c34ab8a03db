use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::store::{StoreError, TermStore, ROOT};

use super::errors::LoadError;
use super::source::Row;

/// Nearest non-empty cell strictly left of `column`. Empty cells never act as
/// ancestors, and nothing to the right of `column` is ever consulted.
pub fn nearest_ancestor(row: &[String], column: usize) -> Option<&str> {
    row[..column.min(row.len())]
        .iter()
        .rev()
        .map(String::as_str)
        .find(|cell| !cell.is_empty())
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AmbiguousParent {
    /// Name used as a parent somewhere in the input.
    pub name: String,
    /// Every parent this name was given in the input; `None` is top level.
    pub placements: Vec<Option<String>>,
    /// An existing term with this name sits somewhere other than the input
    /// implies, so name lookups may resolve to it.
    pub conflicts_with_store: bool,
    /// 1-based data row where the name first appears as a parent.
    pub first_row: usize,
}

/// Finds parent names whose name-only lookup can resolve to the wrong term:
/// names placed under more than one parent in the input, or names whose
/// existing term lives under a different parent than the input places them.
/// Unreadable rows are ignored; row numbers still count them.
pub fn find_ambiguous_parents<S: TermStore + ?Sized>(
    store: &S,
    taxonomy: &str,
    rows: &[Result<Row, LoadError>],
) -> Result<Vec<AmbiguousParent>, StoreError> {
    let mut placements: BTreeMap<&str, BTreeSet<Option<&str>>> = BTreeMap::new();
    let mut used_as_parent: BTreeMap<&str, usize> = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        let Ok(row) = row else {
            continue;
        };
        for (column, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let parent = nearest_ancestor(row, column);
            placements.entry(cell.as_str()).or_default().insert(parent);
            if let Some(parent) = parent {
                used_as_parent.entry(parent).or_insert(index + 1);
            }
        }
    }

    let mut out = Vec::new();
    for (name, first_row) in used_as_parent {
        let Some(placed) = placements.get(name) else {
            continue;
        };
        let conflicts_with_store = match placed.iter().next() {
            Some(expected) if placed.len() == 1 => {
                stored_elsewhere(store, taxonomy, name, *expected)?
            }
            _ => false,
        };
        if placed.len() > 1 || conflicts_with_store {
            out.push(AmbiguousParent {
                name: name.to_string(),
                placements: placed.iter().map(|p| p.map(str::to_string)).collect(),
                conflicts_with_store,
                first_row,
            });
        }
    }
    Ok(out)
}

fn stored_elsewhere<S: TermStore + ?Sized>(
    store: &S,
    taxonomy: &str,
    name: &str,
    expected_parent: Option<&str>,
) -> Result<bool, StoreError> {
    let Some(existing) = store.find_term(name, taxonomy)? else {
        return Ok(false);
    };
    let expected_id = match expected_parent {
        Some(parent) => match store.find_term(parent, taxonomy)? {
            Some(term) => term.id,
            None => return Ok(true),
        },
        None => ROOT,
    };
    Ok(existing.parent_id != expected_id)
}
