//! HTTP client for the remote catalog's create-category endpoint. Houses the
//! `CatalogClient`, response mapping, and the `CreateCategory` trait consumed
//! by the processor.

use crate::catalog::error::{classify_catalog_error, CatalogError};
use crate::catalog::metrics::{ClientMetrics, ClientMetricsSnapshot};
use crate::catalog::options::CatalogClientOptions;
use crate::catalog::payload::{ApiErrorBody, CategoryPayload, CreatedResponse};
use crate::catalog::retry::{retry_with_backoff, RetryBackoff};
use crate::catalog::scheduler::RequestScheduler;
use crate::runtime::config::ImportConfig;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::sync::Arc;
use tokio::time::Instant;

const CREATE_PATH: &str = "/catalog/trees/categories";
const AUTH_HEADER: &str = "X-Auth-Token";

/// Narrow contract the processor drives; lets tests substitute a scripted
/// client for the real HTTP one.
pub trait CreateCategory: Send + Sync {
    fn create_category<'a>(&'a self, payload: &'a CategoryPayload) -> BoxFuture<'a, Result<i64>>;
}

#[derive(Debug)]
pub struct CatalogClient {
    http: reqwest::Client,
    create_url: String,
    options: CatalogClientOptions,
    scheduler: RequestScheduler,
    metrics: Arc<ClientMetrics>,
}

impl CreateCategory for CatalogClient {
    fn create_category<'a>(&'a self, payload: &'a CategoryPayload) -> BoxFuture<'a, Result<i64>> {
        Box::pin(self.create_category(payload))
    }
}

impl CatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        options: CatalogClientOptions,
    ) -> Result<Self> {
        options.validate()?;

        let api_token = api_token.into();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTH_HEADER,
            HeaderValue::from_str(&api_token).context("api token is not a valid header value")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(options.request_timeout)
            .build()
            .context("failed to build catalog HTTP client")?;

        let base_url = base_url.into();
        let create_url = format!("{}{CREATE_PATH}", base_url.trim_end_matches('/'));
        let scheduler = RequestScheduler::new(options.min_interval);

        Ok(Self {
            http,
            create_url,
            options,
            scheduler,
            metrics: Arc::new(ClientMetrics::default()),
        })
    }

    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.catalog.api_base_url(),
            config.catalog.api_token.clone(),
            config.client_options(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.create_url
    }

    pub fn metrics(&self) -> ClientMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Creates one category remotely and returns its id.
    ///
    /// Every attempt is routed through the scheduler (rate-limited) and the
    /// whole operation is wrapped with bounded exponential-backoff retry.
    pub async fn create_category(&self, payload: &CategoryPayload) -> Result<i64> {
        let policy = RetryBackoff::new(self.options.base_delay, self.options.max_attempts);

        let result = retry_with_backoff(
            policy,
            |_| {
                let http = self.http.clone();
                let url = self.create_url.clone();
                let payload = payload.clone();
                let metrics = self.metrics.clone();
                async move { self.scheduler.submit(move || send_create(http, url, payload, metrics)).await }
            },
            classify_catalog_error,
        )
        .await;

        match &result {
            Ok(id) => {
                tracing::info!(name = %payload.name, id, "created catalog category");
            }
            Err(err) => {
                tracing::error!(
                    name = %payload.name,
                    parent_id = ?payload.parent_id,
                    error = %err,
                    "category creation failed"
                );
            }
        }

        result
    }
}

async fn send_create(
    http: reqwest::Client,
    url: String,
    payload: CategoryPayload,
    metrics: Arc<ClientMetrics>,
) -> Result<i64> {
    let start = Instant::now();
    let result = perform_create(&http, &url, &payload).await;
    match &result {
        Ok(_) => metrics.record_success(start.elapsed()),
        Err(_) => metrics.record_failure(start.elapsed()),
    }
    result
}

async fn perform_create(
    http: &reqwest::Client,
    url: &str,
    payload: &CategoryPayload,
) -> Result<i64> {
    // The endpoint accepts a JSON array; the engine always sends exactly one
    // entity per call.
    let response = http
        .post(url)
        .json(&[payload])
        .send()
        .await
        .context("catalog create request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        return Err(CatalogError::Api {
            status: status.as_u16(),
            detail: body.describe(),
        }
        .into());
    }

    let body: CreatedResponse = response
        .json()
        .await
        .map_err(|_| CatalogError::MalformedResponse)?;

    match body.data.first().map(|created| created.category_id) {
        Some(id) if id > 0 => Ok(id),
        _ => Err(CatalogError::MalformedResponse.into()),
    }
}
