//! Wave-by-wave import driver: consults the ledger, resolves parent ids,
//! maps nodes, fans remote calls out through the scheduler funnel, and writes
//! every terminal outcome back to the ledger before the next wave starts.

use crate::catalog::client::CreateCategory;
use crate::catalog::payload::CategoryPayload;
use crate::importer::forest::CodeForest;
use crate::importer::report::{NodeOutcome, RunReport};
use crate::ledger::record::{ImportStatus, ProgressUpdate};
use crate::ledger::store::ProgressLedger;
use crate::mapper::{map_node, MappingConfig};
use crate::runtime::telemetry::Telemetry;
use crate::source::TaxonomyNode;
use anyhow::Result;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// What to do with a node whose declared parent is missing from the input or
/// did not complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingParentPolicy {
    /// Record the node as failed without a remote call.
    #[default]
    Fail,
    /// Substitute the configured default parent id; fail if none is set.
    FallbackToDefault,
}

pub struct ProcessorParams<'a> {
    pub ledger: &'a ProgressLedger,
    pub client: &'a dyn CreateCategory,
    pub mapping: &'a MappingConfig,
    pub tree_id: i64,
    pub default_parent_id: Option<i64>,
    pub policy: MissingParentPolicy,
    pub telemetry: &'a Telemetry,
    pub cancellation: CancellationToken,
}

pub struct Processor<'a> {
    ledger: &'a ProgressLedger,
    client: &'a dyn CreateCategory,
    mapping: &'a MappingConfig,
    tree_id: i64,
    default_parent_id: Option<i64>,
    policy: MissingParentPolicy,
    telemetry: &'a Telemetry,
    cancellation: CancellationToken,
}

/// Per-node parent resolution: either a parent id to use (possibly none for
/// roots without a default) or the failure message to record.
type ParentResolution = std::result::Result<Option<i64>, String>;

enum PlannedAction {
    Cached(i64),
    Fail(String),
    Call(CategoryPayload),
}

struct PlannedNode {
    code: String,
    retry_bump: Option<i64>,
    action: PlannedAction,
}

enum ParentSource {
    Hierarchy,
    Orphan,
}

impl<'a> Processor<'a> {
    pub fn new(params: ProcessorParams<'a>) -> Self {
        let ProcessorParams {
            ledger,
            client,
            mapping,
            tree_id,
            default_parent_id,
            policy,
            telemetry,
            cancellation,
        } = params;
        Self {
            ledger,
            client,
            mapping,
            tree_id,
            default_parent_id,
            policy,
            telemetry,
            cancellation,
        }
    }

    /// Drives every input node to a terminal outcome, or leaves it in
    /// `unresolved_codes` if wave computation stalls on a cycle or the run is
    /// cancelled. Only storage failures return `Err`.
    pub async fn run(&self, nodes: &[TaxonomyNode]) -> Result<RunReport> {
        let forest = CodeForest::new(nodes);
        let mut resolved: HashSet<String> = HashSet::with_capacity(nodes.len());
        let mut outcomes: Vec<NodeOutcome> = Vec::with_capacity(nodes.len());

        // Orphans are terminal on their own; handling them first keeps the
        // wave loop free of missing-parent special cases.
        let orphans = forest.orphans();
        if !orphans.is_empty() {
            tracing::warn!(count = orphans.len(), "input contains orphaned codes");
            let orphan_outcomes = self.process_wave(&orphans, ParentSource::Orphan).await?;
            for outcome in &orphan_outcomes {
                resolved.insert(outcome.code.clone());
            }
            outcomes.extend(orphan_outcomes);
        }

        let mut wave_index = 0usize;
        while resolved.len() < forest.len() {
            if self.cancellation.is_cancelled() {
                tracing::info!("import cancelled; leaving remaining codes unresolved");
                break;
            }

            let wave = forest.next_wave(&resolved);
            if wave.is_empty() {
                tracing::error!(
                    remaining = forest.len() - resolved.len(),
                    "circular dependency detected; cannot compute next wave"
                );
                break;
            }

            wave_index += 1;
            tracing::debug!(wave = wave_index, size = wave.len(), "processing wave");
            let wave_outcomes = self.process_wave(&wave, ParentSource::Hierarchy).await?;
            self.telemetry.record_wave();
            for outcome in &wave_outcomes {
                resolved.insert(outcome.code.clone());
            }
            outcomes.extend(wave_outcomes);
        }

        let unresolved_codes = forest.unresolved(&resolved);
        Ok(RunReport::new(outcomes, unresolved_codes))
    }

    /// One wave: sequential ledger consult and payload build, concurrent
    /// submission of the remote calls (the scheduler serializes dispatch),
    /// then sequential ledger finalization in input order.
    async fn process_wave(
        &self,
        wave: &[&TaxonomyNode],
        source: ParentSource,
    ) -> Result<Vec<NodeOutcome>> {
        let mut plan: Vec<PlannedNode> = Vec::with_capacity(wave.len());

        for node in wave {
            let existing = self.ledger.get(&node.code)?;

            if let Some(remote_id) = existing
                .as_ref()
                .and_then(|record| record.completed_remote_id())
            {
                tracing::debug!(code = %node.code, remote_id, "code already imported; skipping");
                self.telemetry.record_cache_hit();
                plan.push(PlannedNode {
                    code: node.code.clone(),
                    retry_bump: None,
                    action: PlannedAction::Cached(remote_id),
                });
                continue;
            }

            let retry_bump = existing.as_ref().and_then(|record| {
                (record.status == ImportStatus::Failed).then(|| record.retry_count + 1)
            });
            if existing.is_none() {
                let parent = (!node.parent_code.is_empty()).then_some(node.parent_code.as_str());
                self.ledger
                    .insert(&node.code, parent, ImportStatus::Pending)?;
            }

            let action = match self.resolve_parent(node, &source)? {
                Ok(parent_id) => match map_node(node, self.mapping, self.tree_id, parent_id) {
                    Ok(payload) => PlannedAction::Call(payload),
                    Err(err) => PlannedAction::Fail(format!("{err:#}")),
                },
                Err(reason) => PlannedAction::Fail(reason),
            };
            plan.push(PlannedNode {
                code: node.code.clone(),
                retry_bump,
                action,
            });
        }

        let calls: Vec<&CategoryPayload> = plan
            .iter()
            .filter_map(|planned| match &planned.action {
                PlannedAction::Call(payload) => Some(payload),
                _ => None,
            })
            .collect();
        let results = join_all(
            calls
                .iter()
                .map(|payload| self.client.create_category(payload)),
        )
        .await;

        let mut results = results.into_iter();
        let mut outcomes = Vec::with_capacity(plan.len());

        for planned in plan {
            let outcome = match planned.action {
                PlannedAction::Cached(remote_id) => NodeOutcome::cached(planned.code, remote_id),
                PlannedAction::Fail(reason) => {
                    self.finalize_failure(&planned.code, &reason, planned.retry_bump)?;
                    NodeOutcome::failure(planned.code, reason)
                }
                PlannedAction::Call(_) => {
                    let result = results
                        .next()
                        .unwrap_or_else(|| Err(anyhow::anyhow!("remote call result missing")));
                    match result {
                        Ok(remote_id) => {
                            let mut update = ProgressUpdate::completed(remote_id);
                            if let Some(retry_count) = planned.retry_bump {
                                update = update.with_retry_count(retry_count);
                            }
                            self.ledger.update(&planned.code, &update)?;
                            self.telemetry.record_created();
                            NodeOutcome::success(planned.code, remote_id)
                        }
                        Err(err) => {
                            let reason = format!("{err:#}");
                            self.finalize_failure(&planned.code, &reason, planned.retry_bump)?;
                            NodeOutcome::failure(planned.code, reason)
                        }
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn finalize_failure(&self, code: &str, reason: &str, retry_bump: Option<i64>) -> Result<()> {
        tracing::warn!(code, error = reason, "code import failed");
        let mut update = ProgressUpdate::failed(reason);
        if let Some(retry_count) = retry_bump {
            update = update.with_retry_count(retry_count);
        }
        self.ledger.update(code, &update)?;
        self.telemetry.record_failure();
        Ok(())
    }

    /// Resolves the parent remote id for one node. The outer `Result` is
    /// structural (ledger unreachable); the inner one is the node's fate.
    fn resolve_parent(&self, node: &TaxonomyNode, source: &ParentSource) -> Result<ParentResolution> {
        if let ParentSource::Orphan = source {
            return Ok(self.missing_parent(node, "not found"));
        }

        if node.parent_code.is_empty() {
            return Ok(Ok(self.default_parent_id));
        }

        let parent = self.ledger.get(&node.parent_code)?;
        match parent.as_ref().and_then(|record| record.completed_remote_id()) {
            Some(remote_id) => Ok(Ok(Some(remote_id))),
            None => Ok(self.missing_parent(node, "not ready")),
        }
    }

    fn missing_parent(&self, node: &TaxonomyNode, why: &str) -> ParentResolution {
        match self.policy {
            MissingParentPolicy::Fail => {
                Err(format!("parent category {} {why}", node.parent_code))
            }
            MissingParentPolicy::FallbackToDefault => match self.default_parent_id {
                Some(remote_id) => Ok(Some(remote_id)),
                None => Err(format!(
                    "parent category {} {why} and no default parent is configured",
                    node.parent_code
                )),
            },
        }
    }
}
