//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing of the HTTP
//! surface without `yt-dlp` or network access.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use spotitools_core::{
    testing::{MockFetcher, MockResolver},
    Fetcher, JobManager, MetadataResolver, ProxyList,
};

/// Re-export fixtures for test convenience
pub use spotitools_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Track fetching (MockFetcher)
/// - Link resolution (MockResolver)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_start_download() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/downloads", json!({
///         "tracks": [{ "title": "Creep", "artist": "Radiohead" }]
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock fetcher - configure per-query outcomes
    pub fetcher: Arc<MockFetcher>,
    /// Mock resolver - configure link answers
    pub resolver: Arc<MockResolver>,
    /// Job manager behind the router
    pub manager: JobManager,
    /// Download root inside the temp dir
    pub downloads_root: PathBuf,
    /// Temporary directory holding the download root
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response for non-JSON endpoints (SSE, files, metrics)
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloads_root = temp_dir.path().join("downloads");
        std::fs::create_dir_all(&downloads_root).expect("Failed to create download root");

        let mut config = fixtures::config(&downloads_root);
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.retry.max_attempts = test_config.max_attempts;
        if let Some(grace) = test_config.finalize_grace_ms {
            config.downloads.finalize_grace_ms = grace;
        }

        let fetcher = Arc::new(MockFetcher::new());
        let resolver = Arc::new(MockResolver::new());

        let manager = JobManager::new(
            &config,
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
            ProxyList::empty(),
        );

        let resolver_dyn = if test_config.enable_catalog {
            Some(Arc::clone(&resolver) as Arc<dyn MetadataResolver>)
        } else {
            None
        };

        let state = Arc::new(spotitools_server::state::AppState::new(
            config,
            manager.clone(),
            resolver_dyn,
        ));
        let router = spotitools_server::api::create_router(state);

        Self {
            router,
            fetcher,
            resolver,
            manager,
            downloads_root,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let raw = self.send(request).await;
        TestResponse {
            status: raw.status,
            body: parse_json(&raw.body),
        }
    }

    /// Send a GET request and keep the body as bytes.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Start a job and return its id.
    pub async fn start_job(&self, body: Value) -> String {
        let response = self.post("/api/v1/downloads", body).await;
        assert_eq!(response.status, StatusCode::OK, "body: {}", response.body);
        response.body["downloadId"]
            .as_str()
            .expect("downloadId in response")
            .to_string()
    }

    /// Poll the status endpoint until the job reports a terminal state.
    pub async fn wait_for_done(&self, id: &str) -> Value {
        let path = format!("/api/v1/downloads/{}/status", id);
        for _ in 0..400 {
            let response = self.get(&path).await;
            if response.body["done"] == true {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        let raw = self.send(request).await;

        TestResponse {
            status: raw.status,
            body: parse_json(&raw.body),
        }
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = tokio::time::timeout(Duration::from_secs(10), response.into_body().collect())
            .await
            .expect("Response body did not finish")
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawResponse {
            status,
            content_type,
            body,
        }
    }
}

fn parse_json(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Wire the mock resolver into `/api/v1/info`
    pub enable_catalog: bool,
    /// Retry budget per track
    pub max_attempts: u32,
    /// Override for the post-terminal grace period
    pub finalize_grace_ms: Option<u64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enable_catalog: true,
            max_attempts: 2,
            finalize_grace_ms: None,
        }
    }
}

impl TestConfig {
    /// Create config without a metadata resolver.
    pub fn without_catalog() -> Self {
        Self {
            enable_catalog: false,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
