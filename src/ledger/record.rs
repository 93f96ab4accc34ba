//! Row types for the progress ledger: per-code status, the stored record, and
//! the partial-update shape applied by the processor.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Pending,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
        }
    }
}

#[derive(Debug)]
pub struct InvalidStatus(pub String);

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown import status {:?}", self.0)
    }
}

impl std::error::Error for InvalidStatus {}

impl FromStr for ImportStatus {
    type Err = InvalidStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(ImportStatus::Pending),
            "completed" => Ok(ImportStatus::Completed),
            "failed" => Ok(ImportStatus::Failed),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// One durable row, keyed by taxonomy code. Timestamps are RFC 3339 strings;
/// `updated_at` is refreshed on every write.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub code: String,
    pub parent_code: Option<String>,
    pub status: ImportStatus,
    pub remote_id: Option<i64>,
    pub error: Option<String>,
    pub retry_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ProgressRecord {
    /// Remote id if and only if the record is terminally completed.
    pub fn completed_remote_id(&self) -> Option<i64> {
        if self.status == ImportStatus::Completed {
            self.remote_id
        } else {
            None
        }
    }
}

/// Fields to change on an existing record; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub status: Option<ImportStatus>,
    pub remote_id: Option<i64>,
    pub error: Option<String>,
    pub retry_count: Option<i64>,
}

impl ProgressUpdate {
    pub fn completed(remote_id: i64) -> Self {
        Self {
            status: Some(ImportStatus::Completed),
            remote_id: Some(remote_id),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(ImportStatus::Failed),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_retry_count(mut self, retry_count: i64) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.remote_id.is_none()
            && self.error.is_none()
            && self.retry_count.is_none()
    }
}
