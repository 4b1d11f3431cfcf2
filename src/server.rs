//! HTTP surface: `/parse`, `/definitionLookup` and a liveness route, behind a single-origin CORS
//! policy.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::dictionary::{lookup_definitions, CedictDictionary};
use crate::error::PipelineError;
use crate::pipeline::EnrichmentPipeline;

pub struct AppState {
    pub pipeline: EnrichmentPipeline,
    pub dictionary: Arc<CedictDictionary>,
    cors_origin: HeaderValue,
}

impl AppState {
    pub fn new(
        pipeline: EnrichmentPipeline,
        dictionary: Arc<CedictDictionary>,
        cors_origin: &str,
    ) -> anyhow::Result<Self> {
        let cors_origin = HeaderValue::from_str(cors_origin)
            .with_context(|| format!("invalid cors origin: {cors_origin}"))?;
        Ok(Self {
            pipeline,
            dictionary,
            cors_origin,
        })
    }
}

#[derive(Deserialize, Default)]
struct ParseRequest {
    #[serde(default)]
    sentence: Option<String>,
}

#[derive(Deserialize, Default)]
struct LookupRequest {
    #[serde(default)]
    token: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Server is running..." }))
        .route("/parse", post(parse_handler))
        .route("/definitionLookup", post(lookup_handler))
        .layer(middleware::from_fn_with_state(state.clone(), cors))
        .with_state(state)
}

pub async fn serve(bind: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .await
        .context("http server")?;
    Ok(())
}

async fn cors(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let mut resp = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        state.cors_origin.clone(),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    resp
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn parse_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // Unparseable bodies are treated like a missing sentence.
    let request: ParseRequest = serde_json::from_slice(&body).unwrap_or_default();
    let sentence = request.sentence.unwrap_or_default();

    match state.pipeline.run(&sentence).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            let status = status_for(&err);
            if status.is_server_error() {
                log::error!("parse failed: {err}");
            }
            error_response(status, &err.to_string())
        }
    }
}

async fn lookup_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: LookupRequest = serde_json::from_slice(&body).unwrap_or_default();
    let token = request.token.unwrap_or_default();
    let token = token.trim();
    if token.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No input provided");
    }
    let lookup = lookup_definitions(&state.dictionary, token);
    log::debug!(
        "lookup '{token}': {} entries, split={}",
        lookup.dictionary_data.len(),
        lookup.segments.is_some()
    );
    (StatusCode::OK, Json(lookup)).into_response()
}

fn status_for(err: &PipelineError) -> StatusCode {
    if err.is_input() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
