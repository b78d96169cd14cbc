//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! backed by a temporary SQLite campaign store and a scripted mock
//! generator, so batch lifecycles can be driven over HTTP without any
//! external generation backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use batchgen_core::{
    testing::MockStepGenerator, AutomationSettings, BatchOrchestrator, Campaign, CampaignStatus,
    CampaignStore, Config, CreateCampaignRequest, DatabaseConfig, GeneratorBackend,
    GeneratorConfig, OrchestratorConfig, SqliteCampaignStore,
};

/// Re-export fixtures for test convenience
pub use batchgen_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_start_batch() {
///     let fixture = TestFixture::new().await;
///     let campaign = fixture.create_campaign(2);
///
///     let response = fixture
///         .post_empty(&format!("/api/v1/campaigns/{}/generate-batch", campaign.id))
///         .await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Campaign store shared with the router
    pub store: Arc<SqliteCampaignStore>,
    /// Mock generator - script outcomes, delays and hooks
    pub generator: Arc<MockStepGenerator>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with the mock generator enabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let generator = Arc::new(MockStepGenerator::new());
        let store =
            Arc::new(SqliteCampaignStore::new(&db_path).expect("Failed to create campaign store"));

        let orchestrator_config = OrchestratorConfig {
            retry_backoff_ms: 5,
            resume_on_startup: false,
        };

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            orchestrator: orchestrator_config.clone(),
            generator: GeneratorConfig {
                backend: if test_config.disable_generator {
                    GeneratorBackend::Disabled
                } else {
                    GeneratorBackend::Http
                },
                http: None,
            },
            ..Default::default()
        };

        let orchestrator = if test_config.disable_generator {
            None
        } else {
            Some(BatchOrchestrator::new(
                orchestrator_config,
                Arc::clone(&store) as Arc<dyn CampaignStore>,
                Arc::clone(&generator) as Arc<dyn batchgen_core::StepGenerator>,
            ))
        };

        let state = Arc::new(batchgen_server::state::AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn CampaignStore>,
            orchestrator,
        ));

        let router = batchgen_server::api::create_router(state);

        Self {
            router,
            store,
            generator,
            temp_dir,
        }
    }

    /// Insert a draft campaign with `item_count` items.
    pub fn create_campaign(&self, item_count: usize) -> Campaign {
        self.store
            .create(fixtures::create_request(item_count))
            .expect("Failed to create campaign")
    }

    /// Insert a draft campaign with custom automation settings.
    pub fn create_campaign_with_settings(
        &self,
        item_count: usize,
        automation_settings: AutomationSettings,
    ) -> Campaign {
        self.store
            .create(CreateCampaignRequest {
                automation_settings,
                ..fixtures::create_request(item_count)
            })
            .expect("Failed to create campaign")
    }

    /// Read a campaign straight from the store.
    pub fn campaign(&self, id: &str) -> Campaign {
        self.store
            .get(id)
            .expect("Failed to read campaign")
            .expect("Campaign not found")
    }

    /// Poll the store until the campaign reaches `status`.
    pub async fn wait_for_status(&self, id: &str, status: CampaignStatus) -> Campaign {
        for _ in 0..200 {
            let campaign = self.campaign(id);
            if campaign.status == status {
                return campaign;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "Campaign {} did not reach {:?}, last status {:?}",
            id,
            status,
            self.campaign(id).status
        );
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    /// Send a PATCH request with raw string body (for testing malformed JSON).
    pub async fn patch_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request_raw("PATCH", path, body, "application/json")
            .await
    }

    /// Get the raw text body of a GET request (for non-JSON endpoints).
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request with raw string body and custom content type.
    async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
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
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Run without a generator (generation endpoints return 503)
    pub disable_generator: bool,
}

impl TestConfig {
    /// Create config with no generator backend.
    pub fn without_generator() -> Self {
        Self {
            disable_generator: true,
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

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
