use std::collections::{BTreeMap, HashSet};
use std::io::{self, IsTerminal};

use crate::loader::{AmbiguousParent, ImportRunRecord, ImportSummary, TermEvent, TermStatus};
use crate::store::{Taxonomy, Term, TermId, ROOT};

pub fn print_term_event(event: &TermEvent, taxonomy: &str) {
    let palette = Palette::auto();
    for line in format_term_event(event, taxonomy, &palette) {
        println!("{line}");
    }
}

fn format_term_event(event: &TermEvent, taxonomy: &str, palette: &Palette) -> Vec<String> {
    let parent = event.parent.as_deref().unwrap_or("none");
    let mut lines = Vec::new();
    if !event.parent_found {
        lines.push(format!(
            "{} parent '{}' not found for '{}', using top level",
            palette.warning("warning:"),
            parent,
            event.name
        ));
    }
    let line = match &event.status {
        TermStatus::Created(id) => format!(
            "{} added {} {} to {} with parent {}",
            palette.success("created"),
            palette.name(&event.name),
            palette.dim(&format!("#{id}")),
            taxonomy,
            parent
        ),
        TermStatus::Planned => format!(
            "{} {} to {} with parent {}",
            palette.success("would add"),
            palette.name(&event.name),
            taxonomy,
            parent
        ),
        TermStatus::Exists => palette.dim(&format!("exists {} (parent {})", event.name, parent)),
        TermStatus::Failed(message) => format!(
            "{} could not add term {} (row {}, column {}): {}",
            palette.warning("warning:"),
            palette.name(&event.name),
            event.row,
            event.column + 1,
            message
        ),
    };
    lines.push(line);
    lines
}

pub fn print_import_summary(summary: &ImportSummary) {
    let palette = Palette::auto();
    let verb = if summary.dry_run {
        "would import"
    } else {
        "imported"
    };
    println!(
        "{} {} {} term(s) into {}",
        palette.success("success:"),
        verb,
        summary.created_count,
        summary.taxonomy
    );
    println!(
        "{}",
        palette.dim(&format!(
            "run={} status={} rows={} processed={} skipped={} failed={} orphaned={}",
            summary.run_id,
            summary.status,
            summary.row_count,
            summary.processed_count,
            summary.skipped_count,
            summary.failed_count,
            summary.orphaned_count
        ))
    );
    if let Some(error) = summary.last_error.as_deref() {
        println!("{} last error: {}", palette.warning("warning:"), error);
    }
}

pub fn print_term_tree(taxonomy: &str, terms: &[Term]) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&format!("Terms in {taxonomy}")));
    if terms.is_empty() {
        println!("{}", palette.dim("no terms"));
        return;
    }
    for (depth, term) in tree_rows(terms) {
        println!(
            "{}{} {} {}",
            indentation_prefix(depth, &palette),
            palette.id(&term.id.to_string()),
            palette.name(&term.name),
            palette.dim(&format!(
                "(parent {}, children {})",
                term.parent_id, term.child_count
            ))
        );
    }
    println!("{}", palette.dim(&format!("{} term(s)", terms.len())));
}

/// Depth-first order, siblings by id. Terms whose parent is not listed are
/// shown as roots.
fn tree_rows(terms: &[Term]) -> Vec<(usize, &Term)> {
    let ids = terms.iter().map(|term| term.id).collect::<HashSet<_>>();
    let mut children: BTreeMap<TermId, Vec<&Term>> = BTreeMap::new();
    for term in terms {
        let parent = if ids.contains(&term.parent_id) {
            term.parent_id
        } else {
            ROOT
        };
        children.entry(parent).or_default().push(term);
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|term| term.id);
    }

    let mut out = Vec::with_capacity(terms.len());
    let mut stack: Vec<(usize, &Term)> = children
        .get(&ROOT)
        .map(|roots| roots.iter().rev().map(|term| (0, *term)).collect())
        .unwrap_or_default();
    let mut visited = HashSet::new();
    while let Some((depth, term)) = stack.pop() {
        if !visited.insert(term.id) {
            continue;
        }
        out.push((depth, term));
        if let Some(kids) = children.get(&term.id) {
            stack.extend(kids.iter().rev().map(|kid| (depth + 1, *kid)));
        }
    }
    out
}

fn indentation_prefix(depth: usize, palette: &Palette) -> String {
    if depth == 0 {
        return String::new();
    }
    let spaces = "  ".repeat(depth.saturating_sub(1));
    palette.dim(&format!("{spaces}↳ "))
}

pub fn print_taxonomies(taxonomies: &[Taxonomy]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Taxonomies"));
    if taxonomies.is_empty() {
        println!("{}", palette.dim("no taxonomies registered"));
        return;
    }
    for taxonomy in taxonomies {
        let kind = if taxonomy.hierarchical {
            "hierarchical"
        } else {
            "flat"
        };
        println!(
            "{} {} {}",
            palette.name(&taxonomy.name),
            kind,
            palette.dim(&format!("since {}", taxonomy.created_at))
        );
    }
}

pub fn print_runs(runs: &[ImportRunRecord]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Import runs"));
    if runs.is_empty() {
        println!("{}", palette.dim("no import runs recorded"));
        return;
    }
    for run in runs {
        println!(
            "{} [{}] {} created={} skipped={} failed={} {}",
            palette.id(&run.run_id),
            run.status,
            run.taxonomy,
            run.created_count,
            run.skipped_count,
            run.failed_count,
            palette.dim(&run.finished_at)
        );
    }
}

pub fn print_ambiguous_parents(taxonomy: &str, report: &[AmbiguousParent]) {
    let palette = Palette::auto();
    if report.is_empty() {
        println!(
            "{} every parent name in the input resolves unambiguously in {}",
            palette.success("ok:"),
            taxonomy
        );
        return;
    }
    for entry in report {
        let placements = entry
            .placements
            .iter()
            .map(|parent| parent.as_deref().unwrap_or("<top level>"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut line = format!(
            "{} '{}' (first used as a parent on row {}) appears under: {}",
            palette.warning("ambiguous:"),
            entry.name,
            entry.first_row,
            placements
        );
        if entry.conflicts_with_store {
            line.push_str(" and already exists elsewhere in the taxonomy");
        }
        println!("{line}");
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn name(&self, text: &str) -> String {
        self.paint("1", text)
    }

    fn success(&self, text: &str) -> String {
        self.paint("32", text)
    }

    fn warning(&self, text: &str) -> String {
        self.paint("33", text)
    }
}
