//! HTTP API integration tests
//!
//! Drives the router directly with `tower::ServiceExt::oneshot`, no bound
//! port needed.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wavetrust_common::config::{Limits, ServiceConfig};
use wavetrust_ta::{build_router, AppState};

/// Router with default configuration: no upstreams, no sink
fn test_app() -> axum::Router {
    build_router(AppState::from_config(ServiceConfig::default()))
}

/// Router with a small artifact ceiling for boundary tests
fn test_app_with_limit(max_payload_bytes: usize) -> axum::Router {
    let config = ServiceConfig {
        limits: Limits {
            max_payload_bytes,
            fetch_timeout_secs: 1,
        },
        ..ServiceConfig::default()
    };
    build_router(AppState::from_config(config))
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "wavetrust-ta");
    assert_eq!(body["upstreams"], 0);
}

#[tokio::test]
async fn test_analyze_json_blob() {
    let request = json_request(json!({
        "blob": BASE64.encode(b"RIFF fake but plausible audio bytes"),
        "filename": "sample.wav",
        "mimetype": "audio/wav",
    }));

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["metadata"]["filename"], "sample.wav");
    assert_eq!(body["metadata"]["mime"], "audio/wav");
    assert_eq!(body["metadata"]["sha256"].as_str().unwrap().len(), 64);
    assert!(body["features"]["entropy"].as_f64().unwrap() <= 1.0);
    assert!(body["external_signals"].as_array().unwrap().is_empty());

    // No upstreams configured: the method must come from local heuristics
    let method = body["trust_score"]["method"].as_str().unwrap();
    assert_ne!(method, "external-classifier");
    let composite = body["trust_score"]["composite"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&composite));
}

#[tokio::test]
async fn test_analyze_raw_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "audio/mpeg")
        .body(Body::from(&b"ID3\x04\x00\x00\x00\x00\x00\x00 mp3ish"[..]))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["metadata"]["mime"], "audio/mpeg");
    assert_eq!(body["features"]["format"], "mp3");
}

#[tokio::test]
async fn test_missing_source_is_bad_request() {
    let response = test_app()
        .oneshot(json_request(json!({ "filename": "x.wav" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_invalid_base64_is_bad_request() {
    let response = test_app()
        .oneshot(json_request(json!({ "blob": "!!!definitely not base64!!!" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_size_ceiling_boundary() {
    // Exactly at the ceiling: accepted
    let response = test_app_with_limit(16)
        .oneshot(json_request(json!({ "blob": BASE64.encode([7u8; 16]) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // One byte over: rejected with 413
    let response = test_app_with_limit(16)
        .oneshot(json_request(json!({ "blob": BASE64.encode([7u8; 17]) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_empty_raw_body_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "audio/wav")
        .body(Body::empty())
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_untagged_raw_body_gets_sniffed_mime() {
    let request = Request::builder()
        .method("POST")
        .uri("/analyze")
        .body(Body::from(&[0x01u8, 0x02, 0x03, 0x04][..]))
        .unwrap();

    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["metadata"]["mime"], "application/octet-stream");
    assert_eq!(body["features"]["format"], "unknown");
}
