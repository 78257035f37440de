//! SQL migration definitions for the ContextFunnel run-history database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: runs, run_artifacts",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per processing run
CREATE TABLE IF NOT EXISTS runs (
    id                  TEXT PRIMARY KEY,
    reference           TEXT NOT NULL,
    kind                TEXT NOT NULL,
    rule                TEXT NOT NULL,
    status              TEXT NOT NULL,
    uncompressed_tokens INTEGER,
    compressed_tokens   INTEGER,
    url_count           INTEGER,
    error               TEXT,
    created_at          TEXT NOT NULL,
    completed_at        TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_created_at ON runs(created_at);
CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

-- Written artifact files per run
CREATE TABLE IF NOT EXISTS run_artifacts (
    run_id     TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    sha256     TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    PRIMARY KEY (run_id, name)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
