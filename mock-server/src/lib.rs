use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// One request as the server saw it, kept for test assertions.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl Recorded {
    /// Recorded value of `name` (header names are stored lower-case).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Representation served by `/resource`. Replaceable through the state
/// handle, so tests can rotate entity tags while the server runs.
#[derive(Clone, Debug)]
pub struct Resource {
    pub body: String,
    pub etag: String,
}

impl Default for Resource {
    fn default() -> Self {
        Self {
            body: r#"{"version":1}"#.to_string(),
            etag: "\"v1\"".to_string(),
        }
    }
}

/// What `/echo` replies with.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub body: String,
}

/// Shared server state: the current `/resource` representation plus the log
/// of every request served.
#[derive(Debug, Default)]
pub struct AppState {
    pub resource: RwLock<Resource>,
    pub requests: RwLock<Vec<Recorded>>,
}

pub type SharedState = Arc<AppState>;

pub fn app() -> Router {
    app_with_state(SharedState::default())
}

pub fn app_with_state(state: SharedState) -> Router {
    Router::new()
        .route("/resource", get(resource))
        .route("/stale", get(stale))
        .route("/status/{code}", get(status))
        .route("/echo", any(echo))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, SharedState::default()).await
}

/// Serve with a caller-held state handle, so tests can inspect recorded
/// requests and swap the `/resource` representation mid-flight.
pub async fn run_with_state(
    listener: TcpListener,
    state: SharedState,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

/// Conditional GET: 304 when `If-None-Match` equals the current entity tag,
/// otherwise the JSON representation with its `ETag`.
async fn resource(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    record(&state, "GET", "/resource", &headers).await;
    let current = state.resource.read().await.clone();
    let presented = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());
    if presented == Some(current.etag.as_str()) {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, current.etag)]).into_response();
    }
    (
        StatusCode::OK,
        [
            (header::ETAG, current.etag),
            (header::CONTENT_TYPE, "application/json".to_string()),
        ],
        current.body,
    )
        .into_response()
}

/// Unconditional 304, whatever the request carries.
async fn stale(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    record(&state, "GET", "/stale", &headers).await;
    StatusCode::NOT_MODIFIED.into_response()
}

/// Reply with the requested status code and a deterministic body.
async fn status(
    State(state): State<SharedState>,
    Path(code): Path<u16>,
    headers: HeaderMap,
) -> Response {
    record(&state, "GET", &format!("/status/{code}"), &headers).await;
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, format!("synthetic status {code}")).into_response()
}

async fn echo(
    State(state): State<SharedState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    record(&state, method.as_str(), "/echo", &headers).await;
    Json(Echo {
        method: method.to_string(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn record(state: &SharedState, method: &str, path: &str, headers: &HeaderMap) {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    state.requests.write().await.push(Recorded {
        method: method.to_string(),
        path: path.to_string(),
        headers,
    });
}
