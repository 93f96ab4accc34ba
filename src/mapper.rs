//! Pure mapping from a taxonomy node to a catalog category payload: template
//! substitution against an explicit set of known fields, URL transformations,
//! and payload assembly. No I/O, no state.

use crate::catalog::payload::{CategoryPayload, CategoryUrl};
use crate::source::TaxonomyNode;
use anyhow::{bail, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

fn template_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("template variable pattern is valid"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn special_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9-]").expect("special chars pattern is valid"))
}

/// Field-mapping templates, as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MappingConfig {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub url: Option<UrlMapping>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UrlMapping {
    pub path: String,
    #[serde(default)]
    pub transformations: Vec<String>,
}

fn default_visible() -> bool {
    true
}

/// Replaces `${var}` template variables with node field values. Unknown
/// variables resolve to the empty string.
pub fn map_field(template: &str, node: &TaxonomyNode) -> String {
    template_var_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            field_value(node, &caps[1])
        })
        .into_owned()
}

// Explicit accessor table instead of reflection; field names match the wire
// schema of the source data.
fn field_value(node: &TaxonomyNode, field: &str) -> String {
    match field {
        "CodeValue" => node.code.clone(),
        "CodeDescription" => node.description.clone(),
        "CodeNotes" => node.notes.clone(),
        "CodeParent" => node.parent_code.clone(),
        "IssueNumber" => node.issue_number.to_string(),
        "Modified" => node.modified.to_string(),
        _ => String::new(),
    }
}

/// Applies URL path transformations in the listed order. Unrecognized
/// transformation names are ignored.
pub fn apply_url_transformations(path: &str, transformations: &[String]) -> String {
    let mut result = path.to_string();

    for transform in transformations {
        match transform.as_str() {
            "lowercase" => result = result.to_lowercase(),
            "replace-spaces" => result = whitespace_re().replace_all(&result, "-").into_owned(),
            "remove-special-chars" => {
                result = special_chars_re().replace_all(&result, "").into_owned()
            }
            _ => {}
        }
    }

    result
}

pub fn build_url_path(template: &str, node: &TaxonomyNode, transformations: &[String]) -> String {
    apply_url_transformations(&map_field(template, node), transformations)
}

/// Builds the remote payload for one node.
///
/// Fails fast, before any remote call, if a parent id is supplied but is not
/// a positive integer.
pub fn map_node(
    node: &TaxonomyNode,
    config: &MappingConfig,
    tree_id: i64,
    parent_id: Option<i64>,
) -> Result<CategoryPayload> {
    if let Some(id) = parent_id {
        if id <= 0 {
            bail!("parent id {id} for code {} must be a positive integer", node.code);
        }
    }

    Ok(CategoryPayload {
        name: map_field(&config.name, node),
        description: map_field(&config.description, node),
        tree_id,
        parent_id,
        is_visible: config.is_visible,
        url: config.url.as_ref().map(|url| CategoryUrl {
            path: build_url_path(&url.path, node, &url.transformations),
            is_customized: true,
        }),
    })
}
