mod urls;

pub use urls::{extract_post_id, is_story_url, validate_instagram_url};

use crate::config::Config;
use crate::extract::Resolver;
use crate::relay::{attachment_disposition, passthrough_headers, Relay};
use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    resolver: Arc<Resolver>,
    relay: Relay,
}

impl AppState {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            resolver: Arc::new(Resolver::new(client.clone(), &config.backends)),
            relay: Relay::new(client, config.referer()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/extract", post(handle_extract))
        .route("/api/stream", get(handle_stream))
        .route("/api/download", get(handle_download))
        .route("/api/ping", get(handle_ping))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    // One shared client: the connection pool is the bound on concurrent
    // outbound sockets across lookups, probes and relays.
    let client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .pool_max_idle_per_host(8)
        .build()
        .context("Failed to build HTTP client")?;

    let state = AppState::new(&config, client);
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")
}

/// Short, user-safe error surface. Backend and relay detail is logged at the
/// failure site and never makes it into a response body.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ExtractRequest {
    #[serde(default)]
    url: Option<String>,
}

async fn handle_extract(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Parse the body ourselves so a missing or wrong Content-Type still gets
    // the normal 400 path instead of a 415 from the extractor.
    let req: ExtractRequest =
        serde_json::from_slice(&body).unwrap_or(ExtractRequest { url: None });
    let url = req.url.unwrap_or_default().trim().to_string();

    if url.is_empty() {
        return Err(ApiError::bad_request("Please provide an Instagram link."));
    }
    if !validate_instagram_url(&url) {
        return Err(ApiError::bad_request("Invalid Instagram URL."));
    }

    let items = if is_story_url(&url) {
        state.resolver.resolve_story(&url).await
    } else {
        let post_id = extract_post_id(&url)
            .ok_or_else(|| ApiError::internal("Unable to extract Instagram post ID"))?;
        state.resolver.resolve_post(&post_id).await
    }
    // The resolver only ever fails with its generic caller-facing message.
    .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(json!({ "media": items })))
}

#[derive(Debug, Deserialize)]
struct RelayParams {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

async fn handle_stream(
    State(state): State<AppState>,
    Query(params): Query<RelayParams>,
) -> Result<Response, ApiError> {
    let url = require_url(params.url)?;

    let resp = state.relay.open(&url).await.map_err(|e| {
        error!("Stream error: {:#}", e);
        ApiError::internal("Stream failed")
    })?;

    let headers = passthrough_headers(&resp);
    let body = Body::from_stream(resp.bytes_stream());
    Ok((headers, body).into_response())
}

async fn handle_download(
    State(state): State<AppState>,
    Query(params): Query<RelayParams>,
) -> Result<Response, ApiError> {
    let url = require_url(params.url)?;
    let filename = params
        .filename
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| "instagram_media".to_string());

    let resp = state.relay.open(&url).await.map_err(|e| {
        error!("Download error: {:#}", e);
        ApiError::internal("Download failed")
    })?;

    let mut headers = passthrough_headers(&resp);
    headers.insert(header::CONTENT_DISPOSITION, attachment_disposition(&filename));

    let body = Body::from_stream(resp.bytes_stream());
    Ok((headers, body).into_response())
}

async fn handle_ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn require_url(url: Option<String>) -> Result<String, ApiError> {
    url.filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing url"))
}
