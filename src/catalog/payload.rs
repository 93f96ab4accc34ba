//! Request and response body shapes for the catalog create-category endpoint,
//! including the flattening of field-level validation messages from error
//! responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One category to create remotely. The engine treats this as opaque beyond
/// handing it to the client; the mapper owns its construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPayload {
    pub name: String,
    pub description: String,
    pub tree_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub is_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<CategoryUrl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryUrl {
    pub path: String,
    pub is_customized: bool,
}

/// Error body returned by the catalog service on non-2xx responses.
///
/// `errors` values may be a single string or an array of strings depending on
/// the endpoint, so they are kept as raw JSON and flattened on demand.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, Value>,
}

impl ApiErrorBody {
    /// Renders the most specific information available: field-level messages
    /// first, then `detail`, then `title`.
    pub fn describe(&self) -> String {
        if !self.errors.is_empty() {
            return self
                .errors
                .iter()
                .map(|(field, messages)| format!("{field}: {}", flatten_messages(messages)))
                .collect::<Vec<_>>()
                .join("; ");
        }

        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "no error details provided".to_string())
    }
}

fn flatten_messages(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Success body: a list whose first entry carries the created category's id.
#[derive(Debug, Deserialize)]
pub struct CreatedResponse {
    #[serde(default)]
    pub data: Vec<CreatedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedCategory {
    #[serde(default)]
    pub category_id: i64,
}
