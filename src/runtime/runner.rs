//! Top-level orchestration: wires the ledger, the catalog client, and the
//! processor together for one import run.

use crate::catalog::client::CatalogClient;
use crate::importer::processor::{Processor, ProcessorParams};
use crate::importer::report::RunReport;
use crate::ledger::store::ProgressLedger;
use crate::runtime::config::ImportConfig;
use crate::runtime::telemetry::Telemetry;
use crate::source::{load_nodes, validate_hierarchy, TaxonomyNode};
use anyhow::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Owns the shared pieces of an import run and hands external callers a
/// [`CancellationToken`] they can wire into their own signal handling.
pub struct ImportRunner {
    config: ImportConfig,
    client: CatalogClient,
    ledger: ProgressLedger,
    telemetry: Telemetry,
    shutdown: CancellationToken,
}

impl ImportRunner {
    pub fn new(config: ImportConfig) -> Result<Self> {
        config.validate()?;
        let client = CatalogClient::from_config(&config)?;
        let ledger = ProgressLedger::open(&config.ledger_path)?;
        Ok(Self {
            config,
            client,
            ledger,
            telemetry: Telemetry::default(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Imports a validated node list and returns the per-node report.
    pub async fn run(&self, nodes: &[TaxonomyNode]) -> Result<RunReport> {
        validate_hierarchy(nodes);
        tracing::info!(
            count = nodes.len(),
            tree_id = self.config.import.tree_id,
            "starting import run"
        );

        let processor = Processor::new(ProcessorParams {
            ledger: &self.ledger,
            client: &self.client,
            mapping: &self.config.mapping,
            tree_id: self.config.import.tree_id,
            default_parent_id: self.config.import.default_parent_id,
            policy: self.config.import.missing_parent_policy,
            telemetry: &self.telemetry,
            cancellation: self.shutdown.clone(),
        });

        let report = processor.run(nodes).await?;

        let snapshot = self.telemetry.snapshot();
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            cache_hits = report.cache_hits(),
            unresolved = report.unresolved_codes.len(),
            waves = snapshot.waves,
            "import run finished"
        );
        for (code, error) in report.errors() {
            tracing::warn!(code, error, "code left in failed state");
        }

        Ok(report)
    }

    /// Loads a taxonomy source file and imports it.
    pub async fn run_from_file(&self, path: impl AsRef<Path>) -> Result<RunReport> {
        let nodes = load_nodes(path).await?;
        self.run(&nodes).await
    }
}
