pub mod catalog;
pub mod importer;
pub mod ledger;
pub mod mapper;
pub mod runtime;
pub mod source;

pub use catalog::client::{CatalogClient, CreateCategory};
pub use catalog::error::{CatalogError, ErrorClass};
pub use catalog::options::CatalogClientOptions;
pub use catalog::payload::{CategoryPayload, CategoryUrl};
pub use importer::processor::{MissingParentPolicy, Processor, ProcessorParams};
pub use importer::report::{NodeOutcome, RunReport};
pub use ledger::record::{ImportStatus, ProgressRecord, ProgressUpdate};
pub use ledger::store::ProgressLedger;
pub use mapper::{map_field, map_node, MappingConfig, UrlMapping};
pub use runtime::config::{CatalogSettings, ClientSettings, ImportConfig, ImportSettings};
pub use runtime::runner::ImportRunner;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use source::{load_nodes, validate_nodes, TaxonomyNode};
