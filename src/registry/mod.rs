//! Run registry -- the persistent table of provisioned runs, keyed by name.
//!
//! Every mutating call runs inside one SQLite transaction, so callers never
//! observe a half-written batch. Liveness is never stored here; it is always
//! re-derived from the container runtime at query time.

use crate::storage::Pool;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// One row per provisioned run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub name: String,
    pub commit_hash: String,
    pub config: Option<String>,
    /// Generator script body used to sample `config`, retained for
    /// reproducibility.
    pub config_script: Option<String>,
    pub image_id: String,
    pub container_id: String,
    pub volume: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Every `RunRecord` field except `container_id`, which only exists after
/// the launch side effect has succeeded.
#[derive(Debug, Clone)]
pub struct PartialRunRecord {
    pub name: String,
    pub commit_hash: String,
    pub config: Option<String>,
    pub config_script: Option<String>,
    pub image_id: String,
    pub volume: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PartialRunRecord {
    /// Complete the record once the runtime has returned a container id.
    pub fn complete(self, container_id: String) -> RunRecord {
        RunRecord {
            name: self.name,
            commit_hash: self.commit_hash,
            config: self.config,
            config_script: self.config_script,
            image_id: self.image_id,
            container_id,
            volume: self.volume,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

/// Projection used for collision checks and teardown: just enough to find
/// and kill the run's container and volume.
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub name: String,
    pub container_id: String,
    pub volume: String,
}

pub struct Registry {
    pool: Pool,
}

impl Registry {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Rows whose name matches a SQL LIKE pattern (`%`/`_` wildcards).
    pub fn find_by_name_pattern(&self, pattern: &str) -> Result<Vec<RunRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT name, commit_hash, config, config_script, image_id,
                    container_id, volume, description, created_at
             FROM runs WHERE name LIKE ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map([pattern], |row| {
            let created: String = row.get(8)?;
            Ok(RunRecord {
                name: row.get(0)?,
                commit_hash: row.get(1)?,
                config: row.get(2)?,
                config_script: row.get(3)?,
                image_id: row.get(4)?,
                container_id: row.get(5)?,
                volume: row.get(6)?,
                description: row.get(7)?,
                created_at: DateTime::parse_from_rfc3339(&created)
                    .unwrap_or_default()
                    .with_timezone(&Utc),
            })
        })?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    /// Exact-match lookup, used to detect name collisions before
    /// provisioning. An empty name set short-circuits to no rows.
    pub fn find_by_names(&self, names: &[String]) -> Result<Vec<RunHandle>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.pool.get()?;
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "SELECT name, container_id, volume FROM runs WHERE name IN ({}) ORDER BY name",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(rusqlite::params_from_iter(names.iter()), |row| {
            Ok(RunHandle {
                name: row.get(0)?,
                container_id: row.get(1)?,
                volume: row.get(2)?,
            })
        })?;

        let mut handles = Vec::new();
        for r in rows {
            handles.push(r?);
        }
        Ok(handles)
    }

    /// Rows already using any of the given volumes, for reuse warnings.
    pub fn find_by_volumes(&self, volumes: &[String]) -> Result<Vec<(String, String)>> {
        if volumes.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.pool.get()?;
        let placeholders = vec!["?"; volumes.len()].join(", ");
        let sql = format!(
            "SELECT name, volume FROM runs WHERE volume IN ({}) ORDER BY name",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(rusqlite::params_from_iter(volumes.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut pairs = Vec::new();
        for r in rows {
            pairs.push(r?);
        }
        Ok(pairs)
    }

    /// Insert-or-replace the whole batch in one transaction: either all rows
    /// land or none do.
    pub fn upsert_all(&self, records: &[RunRecord]) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        for rec in records {
            tx.execute(
                "INSERT OR REPLACE INTO runs
                     (name, commit_hash, config, config_script, image_id,
                      container_id, volume, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    rec.name,
                    rec.commit_hash,
                    rec.config,
                    rec.config_script,
                    rec.image_id,
                    rec.container_id,
                    rec.volume,
                    rec.description,
                    rec.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to upsert run '{}'", rec.name))?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete rows by exact name. Absent names are not an error.
    pub fn delete_by_names(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        for name in names {
            tx.execute("DELETE FROM runs WHERE name = ?1", params![name])?;
        }
        tx.commit()?;
        Ok(())
    }
}
