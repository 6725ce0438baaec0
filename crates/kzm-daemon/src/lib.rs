// SPDX-License-Identifier: MIT OR Apache-2.0
//! HTTP ingestion for the kinezumiko daemon: a single `POST /` endpoint that
//! decodes a gateway event and feeds it through the shared [`PipelineHost`].
#![deny(unsafe_code)]

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use kzm_docstore::Database;
use kzm_runtime::PipelineHost;

/// Everything a request handler needs: the pipeline and the databases it
/// saves after each event. Both are shared with the plugins constructed
/// at startup, per `PipelineHost::handle_event`'s sharing contract.
pub struct AppState {
    pub host: PipelineHost,
    pub databases: Vec<Arc<Mutex<Database>>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Builds the daemon's router: `POST /` ingests a gateway event, `GET /`
/// answers a human-readable, non-contractual status line.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status).post(ingest_event))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    format!("kinezumiko daemon — plugins loaded: {}\n", state.host.plugin_names().join(", "))
}

async fn ingest_event(State(state): State<Arc<AppState>>, Json(event): Json<Value>) -> Result<(), ApiError> {
    state
        .host
        .handle_event(&event, &state.databases)
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, err.to_string()))
}
