//! Router-level tests for the stream producer
//!
//! Requests go straight through the axum service without binding a socket.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;
use pulse_api::{create_router, AppState, ProducerConfig};
use pulse_core::Sample;
use tokio_stream::StreamExt;
use tower::ServiceExt;

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let router = create_router(AppState::default());

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_stream_headers() {
    let router = create_router(AppState::default());

    let response = router.oneshot(get("/api/sse")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache, no-transform");
    assert_eq!(headers[header::CONNECTION], "keep-alive");
    assert_eq!(headers["x-accel-buffering"], "no");
}

#[tokio::test]
async fn test_stream_emits_sample_with_and_without_keep_alive() {
    for keep_alive in [None, Some(Duration::from_secs(15))] {
        let config = ProducerConfig::default().with_keep_alive(keep_alive);
        let router = create_router(AppState::new(config));

        let response = router.oneshot(get("/api/sse")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

        let mut body = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .expect("no frame before the first tick interval")
            .expect("body ended")
            .expect("body error");

        let text = std::str::from_utf8(&frame).unwrap();
        let data = text.strip_prefix("data: ").unwrap().trim_end();
        assert!(Sample::decode(data).unwrap().is_in_range(), "{:?}", keep_alive);
    }
}

#[tokio::test]
async fn test_custom_stream_path() {
    let config = ProducerConfig::default()
        .with_path("/events")
        .with_tick_interval(Duration::from_millis(50));
    let router = create_router(AppState::new(config));

    let response = router.clone().oneshot(get("/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(get("/api/sse")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_path_returns_json_error() {
    let router = create_router(AppState::default());

    let response = router.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(response.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_refuses_subscriptions_during_shutdown() {
    let state = AppState::default();
    let router = create_router(state.clone());

    state.shutdown_token().cancel();

    let response = router.oneshot(get("/api/sse")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
