//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS runs (
            name TEXT PRIMARY KEY,
            commit_hash TEXT NOT NULL,
            config TEXT,
            config_script TEXT,
            image_id TEXT NOT NULL,
            container_id TEXT NOT NULL,
            volume TEXT NOT NULL,
            description TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_runs_volume ON runs(volume);
        CREATE INDEX IF NOT EXISTS idx_runs_created ON runs(created_at);",
    )?;

    Ok(())
}
