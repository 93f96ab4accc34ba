//! Durable progress store backed by SQLite. One row per taxonomy code; the
//! table is the resumability checkpoint, so its shape must stay stable across
//! restarts of the same run.

use crate::ledger::record::{ImportStatus, ProgressRecord, ProgressUpdate};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS import_progress (
    code        TEXT PRIMARY KEY,
    parent_code TEXT,
    status      TEXT NOT NULL,
    remote_id   INTEGER,
    error       TEXT,
    retry_count INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_import_progress_parent ON import_progress(parent_code);
CREATE INDEX IF NOT EXISTS idx_import_progress_status ON import_progress(status);
";

const COLUMNS: &str =
    "code, parent_code, status, remote_id, error, retry_count, created_at, updated_at";

/// Keyed-by-code progress ledger.
///
/// A single logical writer drives all mutations (the processor never revisits
/// a code concurrently with itself), so no locking beyond SQLite's own is
/// needed.
#[derive(Debug)]
pub struct ProgressLedger {
    conn: Connection,
}

impl ProgressLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open progress ledger at {}", path.display()))?;
        let ledger = Self { conn };
        ledger.initialize()?;
        Ok(ledger)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory ledger")?;
        let ledger = Self { conn };
        ledger.initialize()?;
        Ok(ledger)
    }

    fn initialize(&self) -> Result<()> {
        // WAL keeps reads cheap while the importer writes; returns the active
        // mode, which differs for in-memory databases.
        let _mode: String = self
            .conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .context("failed to set ledger journal mode")?;
        self.conn
            .execute_batch(SCHEMA)
            .context("failed to initialize ledger schema")?;
        tracing::debug!("progress ledger initialized");
        Ok(())
    }

    /// Creates a new record. Fails if the code already has one; the processor
    /// always checks `get` first.
    pub fn insert(
        &self,
        code: &str,
        parent_code: Option<&str>,
        status: ImportStatus,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO import_progress (code, parent_code, status, retry_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
                params![code, parent_code, status.as_str(), now],
            )
            .with_context(|| format!("failed to insert progress record for code {code}"))?;
        Ok(())
    }

    /// Applies the provided fields and refreshes `updated_at`. Fails if the
    /// record does not exist.
    pub fn update(&self, code: &str, update: &ProgressUpdate) -> Result<()> {
        if update.is_empty() {
            bail!("progress update for code {code} contains no fields");
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = update.status {
            sets.push("status = ?");
            values.push(Value::Text(status.as_str().to_owned()));
        }
        if let Some(remote_id) = update.remote_id {
            sets.push("remote_id = ?");
            values.push(Value::Integer(remote_id));
        }
        if let Some(error) = &update.error {
            sets.push("error = ?");
            values.push(Value::Text(error.clone()));
        }
        if let Some(retry_count) = update.retry_count {
            sets.push("retry_count = ?");
            values.push(Value::Integer(retry_count));
        }
        sets.push("updated_at = ?");
        values.push(Value::Text(Utc::now().to_rfc3339()));
        values.push(Value::Text(code.to_owned()));

        let sql = format!(
            "UPDATE import_progress SET {} WHERE code = ?",
            sets.join(", ")
        );
        let affected = self
            .conn
            .execute(&sql, params_from_iter(values))
            .with_context(|| format!("failed to update progress record for code {code}"))?;

        if affected == 0 {
            bail!("no progress record exists for code {code}");
        }
        Ok(())
    }

    pub fn get(&self, code: &str) -> Result<Option<ProgressRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM import_progress WHERE code = ?1"),
                params![code],
                row_to_record,
            )
            .optional()
            .with_context(|| format!("failed to read progress record for code {code}"))
    }

    pub fn list_by_status(&self, status: ImportStatus) -> Result<Vec<ProgressRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM import_progress WHERE status = ?1 ORDER BY code"
            ))
            .context("failed to prepare status query")?;
        let records = stmt
            .query_map(params![status.as_str()], row_to_record)
            .context("failed to query progress records by status")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read progress records by status")?;
        Ok(records)
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM import_progress", [], |row| row.get(0))
            .context("failed to count progress records")
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ProgressRecord> {
    let status_text: String = row.get(2)?;
    let status = ImportStatus::from_str(&status_text).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(err))
    })?;

    Ok(ProgressRecord {
        code: row.get(0)?,
        parent_code: row.get(1)?,
        status,
        remote_id: row.get(3)?,
        error: row.get(4)?,
        retry_count: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
