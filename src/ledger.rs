//! Durable per-code progress ledger: record types plus the SQLite store that
//! makes runs resumable and idempotent.

pub mod record;
pub mod store;

pub use record::{ImportStatus, ProgressRecord, ProgressUpdate};
pub use store::ProgressLedger;
