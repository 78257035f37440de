//! libSQL run-history storage.
//!
//! The [`Storage`] struct wraps a local libSQL database recording one row per
//! processing run plus the artifact files each run produced. The pipeline is
//! the sole writer; the CLI `list` command reads it back.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};

use contextfunnel_shared::{FunnelError, Result, RunRecord};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FunnelError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| FunnelError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| FunnelError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    FunnelError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Run operations
    // -----------------------------------------------------------------------

    /// Insert a freshly started run.
    pub async fn insert_run(&self, record: &RunRecord) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO runs (id, reference, kind, rule, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id.to_string(),
                    record.reference.as_str(),
                    record.kind.as_str(),
                    record.rule.as_str(),
                    record.status.as_str(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| FunnelError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Mark a run completed with its token counts and crawl url count.
    pub async fn complete_run(
        &self,
        id: &str,
        uncompressed_tokens: usize,
        compressed_tokens: usize,
        url_count: Option<usize>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET status = 'completed',
                   uncompressed_tokens = ?1, compressed_tokens = ?2, url_count = ?3,
                   completed_at = ?4
                 WHERE id = ?5",
                params![
                    uncompressed_tokens as i64,
                    compressed_tokens as i64,
                    url_count.map(|c| c as i64),
                    now.as_str(),
                    id,
                ],
            )
            .await
            .map_err(|e| FunnelError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Mark a run failed with its error description.
    pub async fn fail_run(&self, id: &str, error: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET status = 'failed', error = ?1, completed_at = ?2 WHERE id = ?3",
                params![error, now.as_str(), id],
            )
            .await
            .map_err(|e| FunnelError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a run by id.
    pub async fn get_run(&self, id: &str) -> Result<Option<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, reference, kind, rule, status, uncompressed_tokens,
                        compressed_tokens, url_count, error, created_at, completed_at
                 FROM runs WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(|e| FunnelError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(FunnelError::Storage(e.to_string())),
        }
    }

    /// List the most recent runs, newest first.
    pub async fn list_recent_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, reference, kind, rule, status, uncompressed_tokens,
                        compressed_tokens, url_count, error, created_at, completed_at
                 FROM runs ORDER BY created_at DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| FunnelError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Artifact records
    // -----------------------------------------------------------------------

    /// Record one written artifact file for a run (upserts).
    pub async fn record_artifact(
        &self,
        run_id: &str,
        name: &str,
        sha256: &str,
        size_bytes: usize,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO run_artifacts (run_id, name, sha256, size_bytes)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(run_id, name) DO UPDATE SET
                   sha256 = excluded.sha256,
                   size_bytes = excluded.size_bytes",
                params![run_id, name, sha256, size_bytes as i64],
            )
            .await
            .map_err(|e| FunnelError::Storage(e.to_string()))?;
        Ok(())
    }

    /// List artifact records for a run. Returns `Vec<(name, sha256, size_bytes)>`.
    pub async fn artifacts_for_run(&self, run_id: &str) -> Result<Vec<(String, String, usize)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT name, sha256, size_bytes FROM run_artifacts WHERE run_id = ?1 ORDER BY name",
                params![run_id],
            )
            .await
            .map_err(|e| FunnelError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push((
                row.get::<String>(0)
                    .map_err(|e| FunnelError::Storage(e.to_string()))?,
                row.get::<String>(1)
                    .map_err(|e| FunnelError::Storage(e.to_string()))?,
                row.get::<i64>(2)
                    .map_err(|e| FunnelError::Storage(e.to_string()))? as usize,
            ));
        }
        Ok(results)
    }
}

/// Convert a database row to a [`RunRecord`].
fn row_to_record(row: &libsql::Row) -> Result<RunRecord> {
    let parse_time = |s: String| {
        chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| FunnelError::Storage(format!("invalid date: {e}")))
    };

    let id: String = row
        .get(0)
        .map_err(|e| FunnelError::Storage(e.to_string()))?;
    let kind: String = row
        .get(2)
        .map_err(|e| FunnelError::Storage(e.to_string()))?;
    let status: String = row
        .get(4)
        .map_err(|e| FunnelError::Storage(e.to_string()))?;
    let created_at: String = row
        .get(9)
        .map_err(|e| FunnelError::Storage(e.to_string()))?;

    Ok(RunRecord {
        id: id
            .parse()
            .map_err(|e| FunnelError::Storage(format!("invalid run id: {e}")))?,
        reference: row
            .get::<String>(1)
            .map_err(|e| FunnelError::Storage(e.to_string()))?,
        kind: kind.parse().map_err(FunnelError::Storage)?,
        rule: row
            .get::<String>(3)
            .map_err(|e| FunnelError::Storage(e.to_string()))?,
        status: status.parse().map_err(FunnelError::Storage)?,
        uncompressed_tokens: row.get::<i64>(5).ok().map(|v| v as usize),
        compressed_tokens: row.get::<i64>(6).ok().map(|v| v as usize),
        url_count: row.get::<i64>(7).ok().map(|v| v as usize),
        error: row.get::<String>(8).ok(),
        created_at: parse_time(created_at)?,
        completed_at: row.get::<String>(10).ok().map(parse_time).transpose()?,
    })
}
