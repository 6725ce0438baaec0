// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end tests against the daemon's router: the status line and the
//! event-ingestion endpoint's success/error paths.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use kzm_daemon::{build_app, AppState};
use kzm_gateway::{Gateway, NameCache};
use kzm_runtime::PipelineHost;

fn empty_state() -> Arc<AppState> {
    let host = PipelineHost::new(Gateway::new("http://127.0.0.1:0"), Arc::new(NameCache::new()), -1, 300.0);
    Arc::new(AppState { host, databases: Vec::new() })
}

#[tokio::test]
async fn get_reports_the_loaded_plugins() {
    let app = build_app(empty_state());
    let response = app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("kinezumiko daemon"));
}

#[tokio::test]
async fn post_with_a_malformed_event_yields_bad_request() {
    let app = build_app(empty_state());
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(json!({"not": "a gateway event"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_with_an_ignorable_event_succeeds() {
    let app = build_app(empty_state());
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(json!({"post_type": "meta_event", "meta_event_type": "heartbeat"}).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
