//! Catalog client plumbing: rate-limit scheduling, retry/backoff, payload
//! shapes, metrics, and the HTTP client itself.

pub mod client;
pub mod error;
pub mod metrics;
pub mod options;
pub mod payload;
pub mod retry;
pub mod scheduler;

pub use client::{CatalogClient, CreateCategory};
pub use error::{classify_catalog_error, CatalogError, ErrorClass};
pub use metrics::ClientMetricsSnapshot;
pub use options::CatalogClientOptions;
pub use payload::{CategoryPayload, CategoryUrl};
pub use retry::{retry_with_backoff, RetryBackoff};
pub use scheduler::RequestScheduler;
