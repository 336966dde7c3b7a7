//! Shared fakes and request builders for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use tower::ServiceExt;
use url::Url;

use audito::analysis::{Collaborators, UpstreamError, UpstreamKind};
use audito::config::{AdminConfig, AppConfig, UrlPolicyConfig};
use audito::http::{AppState, HttpServer};
use audito::upstream::{Analyzer, FetchedImage, ImageFetcher, PageCapture};
use audito::validation::ValidatedImage;

pub const ADMIN_KEY: &str = "test-admin-key";
const BOUNDARY: &str = "audito-test-boundary";

pub const MODEL_REPLY: &str = r#"Here is the review:
```json
{
  "overall_assessment": "Clear layout with a weak call to action",
  "user_context": "Checkout page",
  "recommendations": [
    {
      "id": "1",
      "title": "Strengthen the primary button",
      "problem": "The pay button blends into the background",
      "impact": "Users hesitate before paying",
      "suggestion": "Use a high-contrast fill",
      "category": "visual"
    }
  ]
}
```"#;

/// Minimal PNG: magic, IHDR with the given size, zero padding to `total_len`.
pub fn png(width: u32, height: u32, total_len: usize) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.resize(total_len.max(bytes.len()), 0);
    bytes
}

/// Analyzer that counts calls and replies with fixed text or a fixed failure.
pub struct FakeAnalyzer {
    calls: AtomicUsize,
    failure: Option<(UpstreamKind, Option<u16>)>,
    delay: Duration,
}

impl FakeAnalyzer {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: None,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(kind: UpstreamKind, status: Option<u16>) -> Self {
        Self {
            failure: Some((kind, status)),
            ..Self::ok()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay, ..Self::ok() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    async fn analyze(&self, _image: &ValidatedImage, _prompt: &str) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.failure {
            Some((kind, status)) => {
                let error = UpstreamError::new(kind, "sk-secret-detail from provider");
                Err(match status {
                    Some(status) => error.with_status(status),
                    None => error,
                })
            }
            None => Ok(MODEL_REPLY.to_string()),
        }
    }
}

/// Fetcher that serves a small PNG for any URL.
#[derive(Default)]
pub struct FakeFetcher {
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, _url: &Url, _max_bytes: usize) -> Result<FetchedImage, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedImage {
            bytes: png(640, 480, 2048),
            content_type: "image/png".to_string(),
        })
    }
}

/// Capture that returns a small PNG screenshot.
#[derive(Default)]
pub struct FakeCapture {
    calls: AtomicUsize,
}

impl FakeCapture {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageCapture for FakeCapture {
    async fn capture(&self, _url: &Url) -> Result<Vec<u8>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(png(1920, 1080, 4096))
    }
}

/// Defaults with DNS re-checks off and the admin surface on.
pub fn test_config() -> AppConfig {
    AppConfig {
        url_policy: UrlPolicyConfig {
            verify_dns: false,
            ..UrlPolicyConfig::default()
        },
        admin: AdminConfig {
            enabled: true,
            api_key: ADMIN_KEY.to_string(),
        },
        ..AppConfig::default()
    }
}

pub struct Harness {
    pub router: Router,
    pub state: AppState,
    pub analyzer: Arc<FakeAnalyzer>,
    pub fetcher: Arc<FakeFetcher>,
    pub capture: Arc<FakeCapture>,
}

impl Harness {
    pub fn new(config: AppConfig) -> Self {
        Self::with_analyzer(config, FakeAnalyzer::ok())
    }

    pub fn with_analyzer(config: AppConfig, analyzer: FakeAnalyzer) -> Self {
        let analyzer = Arc::new(analyzer);
        let fetcher = Arc::new(FakeFetcher::default());
        let capture = Arc::new(FakeCapture::default());
        let server = HttpServer::with_collaborators(
            config,
            Collaborators {
                analyzer: analyzer.clone(),
                fetcher: fetcher.clone(),
                capture: capture.clone(),
            },
        );
        Self {
            router: server.router(),
            state: server.state().clone(),
            analyzer,
            fetcher,
            capture,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Multipart upload with a `file` part and an optional `product_context` part.
pub fn upload_request(
    client_ip: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
    context: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(context) = context {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"product_context\"\r\n\r\n{context}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/analyze/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-forwarded-for", client_ip)
        .body(Body::from(body))
        .unwrap()
}

pub fn url_request(client_ip: &str, url: &str, context: Option<&str>) -> Request<Body> {
    let payload = serde_json::json!({ "url": url, "product_context": context });
    Request::builder()
        .method("POST")
        .uri("/api/analyze/url")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

pub fn admin_request(method: &str, uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
