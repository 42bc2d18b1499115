//! Router-level tests for job submission.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use genjob_callback::{CallbackConfig, CallbackNotifier};
use genjob_models::ModuleRegistry;
use genjob_providers::{
    FallbackProvider, ProviderDispatcher, QueuedMediaConfig, QueuedMediaProvider,
    TextCompletionConfig, TextCompletionProvider,
};
use genjob_storage::{AssetFetcher, AssetUploader, ObjectStore, StorageError, StorageResult};
use genjob_worker::{JobOrchestrator, WorkerConfig};

use crate::config::ApiConfig;
use crate::routes::{create_router, JOBS_PATH};
use crate::state::AppState;

// =============================================================================
// Test Helpers
// =============================================================================

struct NullStore {
    reachable: bool,
}

#[async_trait]
impl ObjectStore for NullStore {
    async fn put_object(&self, _key: &str, _data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(StorageError::config_error("bucket unreachable"))
        }
    }
}

fn router(backend: &MockServer, reachable: bool) -> Router {
    // No provider credentials: only fallback modules can complete
    let dispatcher = ProviderDispatcher::new(
        Arc::new(TextCompletionProvider::new(TextCompletionConfig::default()).unwrap()),
        Arc::new(QueuedMediaProvider::new(QueuedMediaConfig::default()).unwrap()),
        Arc::new(FallbackProvider::new()),
    );
    let uploader = AssetUploader::new(
        Arc::new(NullStore { reachable }),
        AssetFetcher::new(Duration::from_secs(5)).unwrap(),
    );
    let notifier = CallbackNotifier::new(CallbackConfig {
        base_url: backend.uri(),
        signing_secret: "api-secret".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let orchestrator = JobOrchestrator::new(
        Arc::new(ModuleRegistry::builtin()),
        dispatcher,
        uploader,
        notifier,
        WorkerConfig::default(),
    );

    let state = AppState::with_orchestrator(ApiConfig::default(), Arc::new(orchestrator));
    create_router(state, None)
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn post_job(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(JOBS_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<wiremock::Request> {
    for _ in 0..100 {
        let requests = server.received_requests().await.unwrap();
        if requests.len() >= count {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_accepts_job_and_runs_it() {
    let backend = backend().await;
    let app = router(&backend, true);

    let response = app
        .oneshot(post_job(r#"{"job_id":"job-1","module":"music","params":{},"user_id":"u1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Job processing started");
    assert_eq!(body["job_id"], "job-1");

    let requests = wait_for_requests(&backend, 2).await;
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(
        paths,
        vec!["/api/jobs/job-1/preview_ready", "/api/jobs/job-1/callback"]
    );

    let completion: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(completion["status"], "completed");
}

#[tokio::test]
async fn test_unknown_module_is_rejected_without_callbacks() {
    let backend = backend().await;
    let app = router(&backend, true);

    let response = app
        .oneshot(post_job(r#"{"job_id":"job-2","module":"does-not-exist"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "Unknown module: does-not-exist");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_job_id_is_rejected() {
    let backend = backend().await;
    let app = router(&backend, true);

    let response = app.oneshot(post_job(r#"{"module":"chat"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("job_id"));
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let backend = backend().await;
    let app = router(&backend, true);

    let response = app.oneshot(post_job("{not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_other_methods_are_not_allowed() {
    let backend = backend().await;

    for verb in [Method::GET, Method::PUT, Method::DELETE] {
        let request = Request::builder()
            .method(verb)
            .uri(JOBS_PATH)
            .body(Body::empty())
            .unwrap();
        let response = router(&backend, true).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

#[tokio::test]
async fn test_cors_preflight() {
    let backend = backend().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(JOBS_PATH)
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = router(&backend, true).oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_bare_options() {
    let backend = backend().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri(JOBS_PATH)
        .body(Body::empty())
        .unwrap();

    let response = router(&backend, true).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let backend = backend().await;
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = router(&backend, true).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_readiness_reflects_storage() {
    let backend = backend().await;
    let request = || Request::builder().uri("/ready").body(Body::empty()).unwrap();

    let response = router(&backend, true).oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router(&backend, false).oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["storage"]["healthy"], false);
}

#[tokio::test]
async fn test_metrics_label_unknown_paths_as_unmatched() {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let _guard = metrics::set_default_local_recorder(&recorder);

    let backend = backend().await;
    for uri in ["/x1", "/x2", "/health"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router(&backend, true).oneshot(request).await.unwrap();
    }

    let rendered = handle.render();
    assert!(rendered.contains(r#"path="unmatched""#));
    assert!(rendered.contains(r#"path="/health""#));
    assert!(!rendered.contains("/x1"));
    assert!(!rendered.contains("/x2"));
}
