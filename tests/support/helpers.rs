use once_cell::sync::Lazy;
use std::path::Path;
use taxoport::{
    CatalogSettings, ClientSettings, ImportConfig, ImportSettings, MappingConfig,
    MissingParentPolicy, TaxonomyNode,
};
use tracing_subscriber::EnvFilter;

use crate::support::mock_catalog::MOCK_TOKEN;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

/// Configuration pointed at a mock catalog server, with fast retry timings so
/// failure tests stay quick.
pub fn test_config(base_url: &str, ledger_path: &Path) -> ImportConfig {
    ImportConfig {
        catalog: CatalogSettings {
            store_hash: "teststore".into(),
            api_token: MOCK_TOKEN.into(),
            base_url: base_url.into(),
            api_version: "v3".into(),
        },
        import: ImportSettings {
            tree_id: 3,
            default_parent_id: None,
            missing_parent_policy: MissingParentPolicy::Fail,
        },
        mapping: MappingConfig {
            name: "${CodeValue}".into(),
            description: "${CodeDescription}".into(),
            url: None,
            is_visible: true,
        },
        client: ClientSettings {
            min_interval_ms: 0,
            max_attempts: 1,
            base_delay_ms: 1,
            request_timeout_secs: 5,
        },
        ledger_path: ledger_path.to_string_lossy().into_owned(),
    }
}

/// Three-level chain used by most scenarios: A -> AA -> AAA.
pub fn chain_nodes() -> Vec<TaxonomyNode> {
    vec![
        TaxonomyNode::new("A", "The Arts", ""),
        TaxonomyNode::new("AA", "Theory of art", "A"),
        TaxonomyNode::new("AAA", "Aesthetics", "AA"),
    ]
}
