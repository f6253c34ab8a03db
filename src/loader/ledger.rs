use rusqlite::{params, Connection};
use serde::Serialize;

use super::service::ImportSummary;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportRunRecord {
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
    pub last_error: Option<String>,
    pub started_at: String,
    pub finished_at: String,
}

pub fn record_run(conn: &Connection, summary: &ImportSummary) -> rusqlite::Result<()> {
    conn.execute(
        r#"
INSERT INTO import_runs (
    run_id, taxonomy, source_ref, source_sha256, status, row_count, processed_count,
    created_count, skipped_count, failed_count, last_error, started_at, finished_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#,
        params![
            summary.run_id,
            summary.taxonomy,
            summary.source_ref,
            summary.source_sha256,
            summary.status,
            summary.row_count as i64,
            summary.processed_count as i64,
            summary.created_count as i64,
            summary.skipped_count as i64,
            summary.failed_count as i64,
            summary.last_error,
            summary.started_at,
            summary.finished_at
        ],
    )?;
    Ok(())
}

pub fn list_runs(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<ImportRunRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT run_id, taxonomy, source_ref, source_sha256, status, row_count, processed_count,
       created_count, skipped_count, failed_count, last_error, started_at, finished_at
FROM import_runs
ORDER BY finished_at DESC, run_id DESC
LIMIT ?1
"#,
    )?;
    let mut rows = stmt.query(params![limit as i64])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(ImportRunRecord {
            run_id: row.get(0)?,
            taxonomy: row.get(1)?,
            source_ref: row.get(2)?,
            source_sha256: row.get(3)?,
            status: row.get(4)?,
            row_count: row.get::<_, i64>(5)? as u64,
            processed_count: row.get::<_, i64>(6)? as u64,
            created_count: row.get::<_, i64>(7)? as u64,
            skipped_count: row.get::<_, i64>(8)? as u64,
            failed_count: row.get::<_, i64>(9)? as u64,
            last_error: row.get(10)?,
            started_at: row.get(11)?,
            finished_at: row.get(12)?,
        });
    }
    Ok(out)
}
