//! Common test utilities for HTTP testing with mocks.
//!
//! Builds the router in-process around a `ResourceFinder` whose LMS and
//! classifier are mocks, so requests can be driven with `oneshot` without
//! Canvas or a language model.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use hivemind_core::{
    testing::{MockClassifier, MockDescriber, MockLms, RecordingObserver},
    BrainConfig, Config, ResourceFinder,
};
use hivemind_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use hivemind_core::testing::fixtures;

const BOUNDARY: &str = "hivemind-test-boundary";

/// Test fixture with mock collaborators behind the router.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new().await;
///     fixture.lms.set_modules(10, fixtures::weeks(2)).await;
///
///     let response = fixture.get("/api/v1/resources?query=limits").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    pub router: Router,
    pub lms: Arc<MockLms>,
    pub classifier: Arc<MockClassifier>,
    pub describer: Arc<MockDescriber>,
    pub observer: Arc<RecordingObserver>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

/// One part of a multipart form.
pub enum FormPart<'a> {
    Text { name: &'a str, value: &'a str },
    File { name: &'a str, content_type: Option<&'a str>, bytes: &'a [u8] },
}

impl TestFixture {
    /// A fixture serving the sample catalog.
    pub async fn new() -> Self {
        let lms = Arc::new(MockLms::new());
        lms.set_catalog(fixtures::sample_catalog()).await;

        let classifier = Arc::new(MockClassifier::new());
        let describer = Arc::new(MockDescriber::new("a diagram of a derivative"));
        let observer = Arc::new(RecordingObserver::new());

        let finder = ResourceFinder::new(lms.clone(), classifier.clone(), BrainConfig::default())
            .with_describer(describer.clone())
            .with_observer(observer.clone());

        let state = Arc::new(AppState::new(Config::default(), finder));
        let router = create_router(state);

        Self {
            router,
            lms,
            classifier,
            describer,
            observer,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a multipart POST request.
    pub async fn post_form(&self, path: &str, parts: &[FormPart<'_>]) -> TestResponse {
        let mut body: Vec<u8> = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                FormPart::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                FormPart::File {
                    name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\n",
                            name
                        )
                        .as_bytes(),
                    );
                    if let Some(content_type) = content_type {
                        body.extend_from_slice(
                            format!("Content-Type: {}\r\n", content_type).as_bytes(),
                        );
                    }
                    body.extend_from_slice(b"\r\n");
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
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

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
