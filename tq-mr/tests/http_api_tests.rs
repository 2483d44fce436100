//! HTTP API integration tests
//!
//! Exercises the router with in-process requests. The job server URL
//! points at a closed loopback port, so session-start attempts fail fast
//! with the single session-level error the API contract promises.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use tq_mr::config::ServiceConfig;
use tq_mr::{build_router, AppState};

/// App state wired to unreachable collaborators
fn test_app_state() -> AppState {
    let config = ServiceConfig {
        port: 0,
        job_server_url: "http://127.0.0.1:9".to_string(),
        catalog_url: "http://127.0.0.1:9".to_string(),
        fallback: None,
    };
    AppState::new(&config).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_with_uptime() {
    let app = build_router(test_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "tq-mr");
    assert!(body["uptime_seconds"].is_u64());
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn no_session_yields_404() {
    let app = build_router(test_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn track_snapshots_are_empty_without_a_session() {
    let state = test_app_state();

    for uri in ["/session/tracks", "/session/playable"] {
        let response = build_router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }
}

#[tokio::test]
async fn empty_playlist_url_is_rejected() {
    let app = build_router(test_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/session")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({"playlist_url": "  "})).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unreachable_job_server_surfaces_one_session_error() {
    let app = build_router(test_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/session")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(
                        &json!({"playlist_url": "http://example.com/playlist/abc"}),
                    )
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_GATEWAY");
}

#[tokio::test]
async fn next_track_is_null_without_a_session() {
    let app = build_router(test_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/session/next?played=v1,v2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!(null));
}

#[tokio::test]
async fn stopping_without_a_session_reports_false() {
    let app = build_router(test_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["stopped"], json!(false));
}
