//! Database schema migrations.
//!
//! Applied versions are recorded in `_migrations`; batches use `IF NOT EXISTS`.

use crate::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Schema versions in application order.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_books.sql")),
    (2, include_str!("../../migrations/002_book_requests.sql")),
];

/// Apply every migration newer than the recorded schema version.
///
/// Each version is applied and recorded in its own transaction, so a failed
/// batch leaves the schema at the previous version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )?;

        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            tracing::debug!(version, "applying migration");
            apply(conn, version, sql).map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
        }
        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn apply(conn: &mut rusqlite::Connection, version: i64, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, chrono::Utc::now().to_rfc3339()],
    )?;
    tx.commit()
}
