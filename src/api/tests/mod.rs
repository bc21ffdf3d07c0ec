use super::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;

mod jobs;

/// Helper to create a test PrimeCounter instance wrapped in Arc
async fn create_test_counter() -> (Arc<PrimeCounter>, tempfile::TempDir) {
    let (counter, temp_dir) = crate::service::test_helpers::create_test_counter().await;
    (Arc::new(counter), temp_dir)
}

/// Router over a fresh counter using the counter's own config
async fn test_app() -> (Router, Arc<PrimeCounter>, tempfile::TempDir) {
    let (counter, temp_dir) = create_test_counter().await;
    let config = counter.get_config();
    (create_router(counter.clone(), config), counter, temp_dir)
}

/// Send a request and decode the JSON body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (counter, _temp_dir) = create_test_counter().await;

    // Port 0 = OS assigns a free port
    let mut config = (*counter.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let counter = counter.clone();
        let config = config.clone();
        async move { start_api_server(counter, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server exited early");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (counter, _temp_dir) = create_test_counter().await;

    let mut config = (*counter.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(counter, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (counter, _temp_dir) = create_test_counter().await;
    let config = counter.get_config();
    let app = create_router(counter, config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (counter, _temp_dir) = create_test_counter().await;

    let mut config = (*counter.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(counter, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (counter, _temp_dir) = create_test_counter().await;

    let mut config = (*counter.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let counter = Arc::new(PrimeCounter {
        config: Arc::new(config),
        ..(*counter).clone()
    });

    let api_handle = counter.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;
    api_handle.abort();
}
