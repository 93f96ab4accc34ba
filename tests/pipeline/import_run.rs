use std::time::Duration;

use taxoport::{ImportRunner, ImportStatus, TaxonomyNode};
use tempfile::TempDir;

use crate::support::helpers::{chain_nodes, init_tracing, test_config};
use crate::support::mock_catalog::{MockCatalog, MockCatalogServer};

struct Fixture {
    catalog: MockCatalog,
    server: MockCatalogServer,
    // Keeps the ledger file alive for the duration of the test.
    _dir: TempDir,
    runner: ImportRunner,
}

impl Fixture {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(configure: impl FnOnce(&mut taxoport::ImportConfig)) -> Self {
        init_tracing();
        let catalog = MockCatalog::new();
        let server = MockCatalogServer::start(catalog.clone())
            .await
            .expect("mock catalog should start");

        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(server.url(), &dir.path().join("ledger.db"));
        configure(&mut config);
        let runner = ImportRunner::new(config).expect("runner should build");

        Self {
            catalog,
            server,
            _dir: dir,
            runner,
        }
    }

    async fn finish(self) {
        self.server.shutdown().await;
    }
}

#[tokio::test]
async fn imports_a_chain_parent_before_child() {
    let fixture = Fixture::start().await;

    let report = fixture
        .runner
        .run(&chain_nodes())
        .await
        .expect("run should succeed");

    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 0);
    assert!(report.is_complete());

    let created = fixture.catalog.created();
    assert_eq!(created.len(), 3);
    assert_eq!(created[0].name, "A");
    assert_eq!(created[0].parent_id, None);
    assert_eq!(created[0].category_id, 100);
    assert_eq!(created[1].name, "AA");
    assert_eq!(created[1].parent_id, Some(100));
    assert_eq!(created[2].name, "AAA");
    assert_eq!(created[2].parent_id, Some(101));

    let ledger = fixture.runner.ledger();
    for (code, id) in [("A", 100), ("AA", 101), ("AAA", 102)] {
        let record = ledger.get(code).unwrap().expect("record must exist");
        assert_eq!(record.status, ImportStatus::Completed);
        assert_eq!(record.remote_id, Some(id));
    }

    fixture.finish().await;
}

#[tokio::test]
async fn a_second_run_is_a_no_op() {
    let fixture = Fixture::start().await;

    fixture.runner.run(&chain_nodes()).await.unwrap();
    let requests_after_first = fixture.catalog.request_count();

    let report = fixture.runner.run(&chain_nodes()).await.unwrap();

    assert_eq!(report.cache_hits(), 3);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(
        fixture.catalog.request_count(),
        requests_after_first,
        "completed codes must not be re-sent"
    );

    fixture.finish().await;
}

#[tokio::test]
async fn orphans_are_recorded_without_remote_calls() {
    let fixture = Fixture::start().await;

    let nodes = vec![TaxonomyNode::new("ZZ", "Stray", "Y")];
    let report = fixture.runner.run(&nodes).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(fixture.catalog.request_count(), 0);
    assert_eq!(
        report.outcome("ZZ").unwrap().error.as_deref(),
        Some("parent category Y not found")
    );

    fixture.finish().await;
}

#[tokio::test]
async fn a_failed_parent_blocks_its_subtree() {
    let fixture = Fixture::start().await;
    fixture.catalog.fail_always("A", 500);

    let report = fixture.runner.run(&chain_nodes()).await.unwrap();

    // Only the root ever reaches the server; its children fail locally.
    assert_eq!(fixture.catalog.request_count(), 1);
    assert_eq!(report.failed(), 3);

    let root_error = report.outcome("A").unwrap().error.clone().unwrap();
    assert!(root_error.contains("500"), "got: {root_error}");
    assert_eq!(
        report.outcome("AA").unwrap().error.as_deref(),
        Some("parent category A not ready")
    );
    assert_eq!(
        report.outcome("AAA").unwrap().error.as_deref(),
        Some("parent category AA not ready")
    );

    fixture.finish().await;
}

#[tokio::test]
async fn transient_errors_are_retried_within_one_run() {
    let fixture = Fixture::start_with(|config| {
        config.client.max_attempts = 3;
    })
    .await;
    fixture.catalog.fail_times("A", 1, 503);

    let report = fixture
        .runner
        .run(&[TaxonomyNode::new("A", "The Arts", "")])
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert_eq!(fixture.catalog.request_count(), 2);
    let record = fixture.runner.ledger().get("A").unwrap().unwrap();
    assert_eq!(record.status, ImportStatus::Completed);
    assert_eq!(record.retry_count, 0, "in-call retries are not run retries");

    fixture.finish().await;
}

#[tokio::test]
async fn a_rerun_resumes_where_the_failure_left_off() {
    let fixture = Fixture::start().await;
    fixture.catalog.fail_times("AA", 1, 500);

    let first = fixture.runner.run(&chain_nodes()).await.unwrap();
    assert_eq!(first.succeeded(), 1);
    assert_eq!(first.failed(), 2);

    let second = fixture.runner.run(&chain_nodes()).await.unwrap();

    assert_eq!(second.succeeded(), 3);
    assert_eq!(second.cache_hits(), 1, "only A was already completed");
    assert_eq!(second.failed(), 0);

    let ledger = fixture.runner.ledger();
    let retried = ledger.get("AA").unwrap().unwrap();
    assert_eq!(retried.status, ImportStatus::Completed);
    assert_eq!(retried.retry_count, 1);

    // AA keeps its parent link to the id A got in the first run.
    let id_of_a = fixture.catalog.id_of("A").unwrap();
    let created_aa = fixture
        .catalog
        .created()
        .into_iter()
        .find(|record| record.name == "AA")
        .unwrap();
    assert_eq!(created_aa.parent_id, Some(id_of_a));

    fixture.finish().await;
}

#[tokio::test]
async fn malformed_success_bodies_fail_the_code() {
    let fixture = Fixture::start().await;
    fixture.catalog.malformed_for("A");

    let report = fixture
        .runner
        .run(&[TaxonomyNode::new("A", "The Arts", "")])
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    let error = report.outcome("A").unwrap().error.clone().unwrap();
    assert!(error.contains("without a category id"), "got: {error}");

    fixture.finish().await;
}

#[tokio::test]
async fn rejected_auth_fails_the_code() {
    let fixture = Fixture::start_with(|config| {
        config.catalog.api_token = "wrong-token".into();
    })
    .await;

    let report = fixture
        .runner
        .run(&[TaxonomyNode::new("A", "The Arts", "")])
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    let error = report.outcome("A").unwrap().error.clone().unwrap();
    assert!(error.contains("401"), "got: {error}");

    fixture.finish().await;
}

#[tokio::test]
async fn requests_are_spaced_by_the_configured_interval() {
    let fixture = Fixture::start_with(|config| {
        config.client.min_interval_ms = 40;
    })
    .await;

    let nodes = vec![
        TaxonomyNode::new("A", "The Arts", ""),
        TaxonomyNode::new("B", "Language", ""),
        TaxonomyNode::new("C", "Reference", ""),
    ];
    let report = fixture.runner.run(&nodes).await.unwrap();
    assert_eq!(report.succeeded(), 3);

    let times = fixture.catalog.request_times();
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(38),
            "requests arrived {gap:?} apart"
        );
    }

    fixture.finish().await;
}

#[tokio::test]
async fn sibling_count_reflects_the_whole_wave() {
    let fixture = Fixture::start().await;

    let nodes = vec![
        TaxonomyNode::new("A", "The Arts", ""),
        TaxonomyNode::new("AA", "Theory of art", "A"),
        TaxonomyNode::new("AB", "Painting", "A"),
        TaxonomyNode::new("AC", "Sculpture", "A"),
    ];
    let report = fixture.runner.run(&nodes).await.unwrap();

    assert_eq!(report.succeeded(), 4);
    let created = fixture.catalog.created();
    assert_eq!(created[0].name, "A");
    // All three siblings attach to A, whatever order the wave sent them in.
    let id_of_a = fixture.catalog.id_of("A").unwrap();
    for record in &created[1..] {
        assert_eq!(record.parent_id, Some(id_of_a));
    }

    fixture.finish().await;
}
