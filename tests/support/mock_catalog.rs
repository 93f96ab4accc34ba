use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, RwLock,
    },
    time::Instant,
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const MOCK_TOKEN: &str = "test-token";

const CREATE_PATH: &str = "/catalog/trees/categories";

/// One successfully created category as the mock saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedRecord {
    pub name: String,
    pub parent_id: Option<i64>,
    pub category_id: i64,
}

struct FailurePlan {
    status: u16,
    /// None means fail every request for this name.
    remaining: Option<u32>,
}

enum ResponseMode {
    Normal,
    Malformed,
}

#[derive(Default)]
struct CatalogState {
    created: Vec<CreatedRecord>,
    request_times: Vec<Instant>,
    failures: HashMap<String, FailurePlan>,
    malformed: HashMap<String, ()>,
}

/// Scriptable in-process stand-in for the remote catalog's create-category
/// endpoint. Requires the [`MOCK_TOKEN`] auth header and assigns ids from a
/// monotonically increasing counter.
#[derive(Clone)]
pub struct MockCatalog {
    state: Arc<RwLock<CatalogState>>,
    next_id: Arc<AtomicI64>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(CatalogState::default())),
            next_id: Arc::new(AtomicI64::new(100)),
        }
    }

    /// Every request for this category name fails with the given status.
    pub fn fail_always(&self, name: impl Into<String>, status: u16) {
        let mut state = self.state.write().expect("mock catalog poisoned");
        state.failures.insert(
            name.into(),
            FailurePlan {
                status,
                remaining: None,
            },
        );
    }

    /// The next `times` requests for this category name fail, then requests
    /// succeed again.
    pub fn fail_times(&self, name: impl Into<String>, times: u32, status: u16) {
        let mut state = self.state.write().expect("mock catalog poisoned");
        state.failures.insert(
            name.into(),
            FailurePlan {
                status,
                remaining: Some(times),
            },
        );
    }

    /// Requests for this category name succeed at the HTTP level but return a
    /// body without a usable category id.
    pub fn malformed_for(&self, name: impl Into<String>) {
        let mut state = self.state.write().expect("mock catalog poisoned");
        state.malformed.insert(name.into(), ());
    }

    pub fn created(&self) -> Vec<CreatedRecord> {
        self.state
            .read()
            .expect("mock catalog poisoned")
            .created
            .clone()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created()
            .into_iter()
            .map(|record| record.name)
            .collect()
    }

    pub fn id_of(&self, name: &str) -> Option<i64> {
        self.created()
            .into_iter()
            .find(|record| record.name == name)
            .map(|record| record.category_id)
    }

    /// Total create requests received, including rejected and failed ones.
    pub fn request_count(&self) -> usize {
        self.state
            .read()
            .expect("mock catalog poisoned")
            .request_times
            .len()
    }

    pub fn request_times(&self) -> Vec<Instant> {
        self.state
            .read()
            .expect("mock catalog poisoned")
            .request_times
            .clone()
    }

    fn handle_create(&self, name: &str, parent_id: Option<i64>) -> (StatusCode, Value) {
        let mode = {
            let mut state = self.state.write().expect("mock catalog poisoned");

            let failure_status = match state.failures.get_mut(name) {
                Some(plan) => match plan.remaining.as_mut() {
                    None => Some(plan.status),
                    Some(0) => {
                        state.failures.remove(name);
                        None
                    }
                    Some(remaining) => {
                        *remaining -= 1;
                        let status = plan.status;
                        if *remaining == 0 {
                            state.failures.remove(name);
                        }
                        Some(status)
                    }
                },
                None => None,
            };

            if let Some(status) = failure_status {
                return (
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    json!({
                        "title": "Category create rejected",
                        "detail": format!("scripted failure for {name}"),
                    }),
                );
            }

            if state.malformed.contains_key(name) {
                ResponseMode::Malformed
            } else {
                ResponseMode::Normal
            }
        };

        match mode {
            ResponseMode::Malformed => (StatusCode::OK, json!({ "data": [] })),
            ResponseMode::Normal => {
                let category_id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let mut state = self.state.write().expect("mock catalog poisoned");
                state.created.push(CreatedRecord {
                    name: name.to_string(),
                    parent_id,
                    category_id,
                });
                (
                    StatusCode::OK,
                    json!({ "data": [{ "category_id": category_id }], "meta": {} }),
                )
            }
        }
    }
}

pub struct MockCatalogServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockCatalogServer {
    pub async fn start(catalog: MockCatalog) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock catalog listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let catalog = catalog.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    serve_request(catalog.clone(), req)
                }))
            }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock catalog server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(
    catalog: MockCatalog,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::POST || !req.uri().path().ends_with(CREATE_PATH) {
        return Ok(json_response(
            StatusCode::NOT_FOUND,
            json!({ "title": "Not found", "detail": req.uri().path() }),
        ));
    }

    {
        let mut state = catalog.state.write().expect("mock catalog poisoned");
        state.request_times.push(Instant::now());
    }

    let token = req
        .headers()
        .get("X-Auth-Token")
        .and_then(|value| value.to_str().ok());
    if token != Some(MOCK_TOKEN) {
        return Ok(json_response(
            StatusCode::UNAUTHORIZED,
            json!({ "title": "Unauthorized", "detail": "invalid or missing auth token" }),
        ));
    }

    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                json!({ "title": "Bad request", "detail": format!("failed to read body: {err}") }),
            ))
        }
    };

    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                json!({ "title": "Bad request", "detail": format!("invalid JSON: {err}") }),
            ))
        }
    };

    // The endpoint accepts an array of categories; the importer always sends
    // exactly one.
    let entry = match payload.as_array().and_then(|entries| entries.first()) {
        Some(entry) => entry,
        None => {
            return Ok(json_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "title": "Unprocessable", "detail": "expected a non-empty array" }),
            ))
        }
    };

    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if name.is_empty() {
        return Ok(json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({
                "title": "Unprocessable",
                "errors": { "name": "name is required" },
            }),
        ));
    }
    let parent_id = entry.get("parent_id").and_then(Value::as_i64);

    let (status, body) = catalog.handle_create(&name, parent_id);
    Ok(json_response(status, body))
}

fn json_response(status: StatusCode, body: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}
