//! Typed error kinds surfaced by the catalog client plus the retry
//! classification used to decide whether an attempt is worth repeating.

use anyhow::Error;

#[derive(Debug)]
pub enum CatalogError {
    /// The remote service answered with a non-success HTTP status.
    Api { status: u16, detail: String },
    /// The remote service reported success but the body carried no usable id.
    MalformedResponse,
    /// The request scheduler worker is gone; no further calls can be made.
    SchedulerStopped,
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Api { status, detail } => {
                write!(f, "catalog API error ({status}): {detail}")
            }
            CatalogError::MalformedResponse => {
                write!(f, "catalog returned a success response without a category id")
            }
            CatalogError::SchedulerStopped => {
                write!(f, "request scheduler worker has stopped")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Retry disposition for a failed catalog call.
///
/// The importer retries everything by default; the tag exists so callers and
/// tests can mark specific failures as not worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

/// Default classification: every remote failure is retried identically,
/// including rejected requests and malformed success bodies. Only a dead
/// scheduler aborts immediately, since repeating the call cannot help.
pub fn classify_catalog_error(err: &Error) -> ErrorClass {
    match err.downcast_ref::<CatalogError>() {
        Some(CatalogError::SchedulerStopped) => ErrorClass::Permanent,
        _ => ErrorClass::Transient,
    }
}
