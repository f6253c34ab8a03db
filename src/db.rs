use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CURRENT_SCHEMA_VERSION: i64 = 2;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "baseline_term_schema_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS taxonomy (
    name TEXT PRIMARY KEY,
    hierarchical INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS term (
    term_id INTEGER PRIMARY KEY AUTOINCREMENT,
    taxonomy TEXT NOT NULL REFERENCES taxonomy(name),
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    parent_id INTEGER NOT NULL DEFAULT 0,
    child_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_term_taxonomy_parent_name
    ON term(taxonomy, parent_id, name);
CREATE UNIQUE INDEX IF NOT EXISTS idx_term_taxonomy_slug ON term(taxonomy, slug);
CREATE INDEX IF NOT EXISTS idx_term_taxonomy_name ON term(taxonomy, name);
"#,
    },
    Migration {
        version: 2,
        name: "import_runs_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS import_runs (
    run_id TEXT PRIMARY KEY,
    taxonomy TEXT NOT NULL,
    source_ref TEXT NOT NULL,
    source_sha256 TEXT NOT NULL,
    status TEXT NOT NULL,
    row_count INTEGER NOT NULL DEFAULT 0,
    processed_count INTEGER NOT NULL DEFAULT 0,
    created_count INTEGER NOT NULL DEFAULT 0,
    skipped_count INTEGER NOT NULL DEFAULT 0,
    failed_count INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_import_runs_finished_at ON import_runs(finished_at);
"#,
    },
];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tracing::debug!(
            version = migration.version,
            name = migration.name,
            "applying migration"
        );
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyRecord {
    pub name: String,
    pub hierarchical: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRecord {
    pub term_id: i64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    pub parent_id: i64,
    pub child_count: i64,
}

const TERM_COLUMNS: &str = "term_id, taxonomy, name, slug, parent_id, child_count";

fn term_from_row(row: &rusqlite::Row<'_>) -> Result<TermRecord> {
    Ok(TermRecord {
        term_id: row.get(0)?,
        taxonomy: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        parent_id: row.get(4)?,
        child_count: row.get(5)?,
    })
}

pub fn upsert_taxonomy(conn: &Connection, name: &str, hierarchical: bool) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO taxonomy (name, hierarchical, created_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(name) DO UPDATE SET hierarchical = excluded.hierarchical
"#,
        params![name, hierarchical, now_utc_rfc3339()],
    )?;
    Ok(())
}

pub fn get_taxonomy(conn: &Connection, name: &str) -> Result<Option<TaxonomyRecord>> {
    conn.query_row(
        "SELECT name, hierarchical, created_at FROM taxonomy WHERE name = ?1",
        params![name],
        |row| {
            Ok(TaxonomyRecord {
                name: row.get(0)?,
                hierarchical: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn list_taxonomies(conn: &Connection) -> Result<Vec<TaxonomyRecord>> {
    let mut stmt =
        conn.prepare("SELECT name, hierarchical, created_at FROM taxonomy ORDER BY name ASC")?;
    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(TaxonomyRecord {
            name: row.get(0)?,
            hierarchical: row.get(1)?,
            created_at: row.get(2)?,
        });
    }
    Ok(result)
}

/// First term with `name` in `taxonomy`, ignoring its parent. Lowest id wins.
pub fn find_term_by_name(
    conn: &Connection,
    taxonomy: &str,
    name: &str,
) -> Result<Option<TermRecord>> {
    conn.query_row(
        &format!(
            "SELECT {TERM_COLUMNS} FROM term WHERE taxonomy = ?1 AND name = ?2 \
             ORDER BY term_id ASC LIMIT 1"
        ),
        params![taxonomy, name],
        term_from_row,
    )
    .optional()
}

pub fn get_term(conn: &Connection, taxonomy: &str, term_id: i64) -> Result<Option<TermRecord>> {
    conn.query_row(
        &format!("SELECT {TERM_COLUMNS} FROM term WHERE taxonomy = ?1 AND term_id = ?2"),
        params![taxonomy, term_id],
        term_from_row,
    )
    .optional()
}

pub fn term_exists(conn: &Connection, taxonomy: &str, name: &str, parent_id: i64) -> Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM term WHERE taxonomy = ?1 AND name = ?2 AND parent_id = ?3)",
        params![taxonomy, name, parent_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub fn slug_exists(conn: &Connection, taxonomy: &str, slug: &str) -> Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM term WHERE taxonomy = ?1 AND slug = ?2)",
        params![taxonomy, slug],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub struct InsertTerm<'a> {
    pub taxonomy: &'a str,
    pub name: &'a str,
    pub slug: &'a str,
    pub parent_id: i64,
}

pub fn insert_term(conn: &Connection, args: &InsertTerm<'_>) -> Result<i64> {
    conn.execute(
        r#"
INSERT INTO term (taxonomy, name, slug, parent_id, child_count, created_at)
VALUES (?1, ?2, ?3, ?4, 0, ?5)
"#,
        params![
            args.taxonomy,
            args.name,
            args.slug,
            args.parent_id,
            now_utc_rfc3339()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_terms(conn: &Connection, taxonomy: &str) -> Result<Vec<TermRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TERM_COLUMNS} FROM term WHERE taxonomy = ?1 ORDER BY term_id ASC"
    ))?;
    let mut rows = stmt.query(params![taxonomy])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(term_from_row(row)?);
    }
    Ok(result)
}

/// Recomputes `child_count` for the given parents. Root (0) is ignored.
pub fn recount_children(conn: &Connection, taxonomy: &str, parent_ids: &[i64]) -> Result<usize> {
    let mut stmt = conn.prepare(
        r#"
UPDATE term
SET child_count = (
    SELECT COUNT(*) FROM term AS child
    WHERE child.taxonomy = term.taxonomy AND child.parent_id = term.term_id
)
WHERE taxonomy = ?1 AND term_id = ?2
"#,
    )?;
    let mut updated = 0;
    for parent_id in parent_ids.iter().copied().filter(|id| *id != 0) {
        updated += stmt.execute(params![taxonomy, parent_id])?;
    }
    Ok(updated)
}
