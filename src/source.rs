//! Taxonomy source data: the node type as it appears on the wire and the
//! validated JSON loader that rejects schema errors before the engine runs.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// One entry in the input hierarchical code list. Identity is `code`; an
/// empty `parent_code` means the node is a root.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TaxonomyNode {
    #[serde(rename = "CodeValue")]
    pub code: String,
    #[serde(rename = "CodeDescription")]
    pub description: String,
    #[serde(rename = "CodeNotes", default)]
    pub notes: String,
    #[serde(rename = "CodeParent", default)]
    pub parent_code: String,
    #[serde(rename = "IssueNumber")]
    pub issue_number: i64,
    #[serde(rename = "Modified")]
    pub modified: Modified,
}

impl TaxonomyNode {
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        parent_code: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            notes: String::new(),
            parent_code: parent_code.into(),
            issue_number: 1,
            modified: Modified::Numeric(0),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_code.is_empty()
    }
}

/// Opaque modification stamp; the source emits either a string or a number.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Modified {
    Text(String),
    Numeric(i64),
}

impl fmt::Display for Modified {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modified::Text(value) => f.write_str(value),
            Modified::Numeric(value) => write!(f, "{value}"),
        }
    }
}

/// Loads and validates a taxonomy code list from a JSON file.
pub async fn load_nodes(path: impl AsRef<Path>) -> Result<Vec<TaxonomyNode>> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read source file {}", path.display()))?;
    let nodes: Vec<TaxonomyNode> =
        serde_json::from_str(&raw).context("source file is not a valid taxonomy code list")?;

    validate_nodes(&nodes)?;
    tracing::info!(count = nodes.len(), "loaded taxonomy codes");
    Ok(nodes)
}

/// Schema checks beyond what deserialization enforces: non-empty code and
/// description, and code uniqueness within the run.
pub fn validate_nodes(nodes: &[TaxonomyNode]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(nodes.len());

    for (index, node) in nodes.iter().enumerate() {
        if node.code.trim().is_empty() {
            bail!("node at index {index} has an empty code");
        }
        if node.description.trim().is_empty() {
            bail!("node {} has an empty description", node.code);
        }
        if !seen.insert(node.code.as_str()) {
            bail!("duplicate code {} in source data", node.code);
        }
    }
    Ok(())
}

/// Logs a warning listing codes whose declared parent is absent from the
/// input. These nodes are still handed to the engine, which records them as
/// failed without calling the remote service.
pub fn validate_hierarchy(nodes: &[TaxonomyNode]) {
    let codes: HashSet<&str> = nodes.iter().map(|node| node.code.as_str()).collect();
    let orphans: Vec<&str> = nodes
        .iter()
        .filter(|node| !node.parent_code.is_empty() && !codes.contains(node.parent_code.as_str()))
        .map(|node| node.code.as_str())
        .collect();

    if !orphans.is_empty() {
        tracing::warn!(?orphans, "found codes with non-existent parents");
    }
}
