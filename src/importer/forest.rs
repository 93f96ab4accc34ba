//! Flat-list-to-forest resolution: code index, orphan detection, and the
//! strict level-order wave computation that guarantees a parent reaches a
//! terminal state before any of its children are considered.

use crate::source::TaxonomyNode;
use std::collections::{HashMap, HashSet};

pub struct CodeForest<'a> {
    nodes: &'a [TaxonomyNode],
    index: HashMap<&'a str, &'a TaxonomyNode>,
}

impl<'a> CodeForest<'a> {
    pub fn new(nodes: &'a [TaxonomyNode]) -> Self {
        let index = nodes
            .iter()
            .map(|node| (node.code.as_str(), node))
            .collect();
        Self { nodes, index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn node(&self, code: &str) -> Option<&'a TaxonomyNode> {
        self.index.get(code).copied()
    }

    /// A node is an orphan when its declared parent does not appear among the
    /// input codes at all.
    pub fn is_orphan(&self, node: &TaxonomyNode) -> bool {
        !node.parent_code.is_empty() && !self.contains(&node.parent_code)
    }

    pub fn orphans(&self) -> Vec<&'a TaxonomyNode> {
        self.nodes
            .iter()
            .filter(|node| self.is_orphan(node))
            .collect()
    }

    /// Next wave in input order: unresolved nodes whose parent is empty or
    /// already resolved (successfully or not). An empty wave while
    /// unresolved nodes remain means the remainder is cyclic.
    pub fn next_wave(&self, resolved: &HashSet<String>) -> Vec<&'a TaxonomyNode> {
        self.nodes
            .iter()
            .filter(|node| {
                !resolved.contains(&node.code)
                    && (node.parent_code.is_empty() || resolved.contains(&node.parent_code))
            })
            .collect()
    }

    pub fn unresolved(&self, resolved: &HashSet<String>) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|node| !resolved.contains(&node.code))
            .map(|node| node.code.clone())
            .collect()
    }
}
