//! Failure injection: collaborator errors surface as classified responses.

use axum::http::StatusCode;

use audito::analysis::UpstreamKind;

mod common;
use common::{body_json, png, upload_request, url_request, FakeAnalyzer, Harness};

async fn upload_with_failure(kind: UpstreamKind, status: Option<u16>) -> (StatusCode, serde_json::Value, Harness) {
    let harness = Harness::with_analyzer(common::test_config(), FakeAnalyzer::failing(kind, status));
    let response = harness
        .send(upload_request("192.0.2.1", "screen.png", "image/png", &png(320, 240, 512), None))
        .await;
    let status = response.status();
    (status, body_json(response).await, harness)
}

#[tokio::test]
async fn test_upstream_kinds_map_to_status() {
    let cases = [
        (UpstreamKind::AuthConfig, Some(401), StatusCode::INTERNAL_SERVER_ERROR, false),
        (UpstreamKind::Quota, Some(429), StatusCode::SERVICE_UNAVAILABLE, true),
        (UpstreamKind::Timeout, None, StatusCode::REQUEST_TIMEOUT, true),
        (UpstreamKind::Network, None, StatusCode::SERVICE_UNAVAILABLE, true),
        (UpstreamKind::Generic, Some(500), StatusCode::INTERNAL_SERVER_ERROR, true),
    ];

    for (kind, upstream_status, expected, retryable) in cases {
        let (status, body, _) = upload_with_failure(kind, upstream_status).await;
        assert_eq!(status, expected, "{kind:?}");
        assert_eq!(body["success"], false);
        assert_eq!(body["retryable"], retryable, "{kind:?}");
        assert_eq!(body["overall_assessment"], "Analysis failed");
    }
}

#[tokio::test]
async fn test_upstream_detail_is_not_leaked() {
    let (_, body, _) = upload_with_failure(UpstreamKind::AuthConfig, Some(401)).await;
    let text = body.to_string();
    assert!(!text.contains("sk-secret"));
    assert_eq!(
        body["error"],
        "The analysis service is not configured correctly. Contact the administrator."
    );
}

#[tokio::test]
async fn test_failed_analysis_is_not_cached() {
    let (_, _, harness) = upload_with_failure(UpstreamKind::Timeout, None).await;
    assert_eq!(harness.analyzer.calls(), 1);

    let response = harness
        .send(upload_request("192.0.2.1", "screen.png", "image/png", &png(320, 240, 512), None))
        .await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(harness.analyzer.calls(), 2);
    assert!(harness.state.orchestrator.cache().is_empty());
}

#[tokio::test]
async fn test_url_analysis_failure_after_capture() {
    let harness = Harness::with_analyzer(
        common::test_config(),
        FakeAnalyzer::failing(UpstreamKind::Quota, Some(429)),
    );
    let response = harness
        .send(url_request("192.0.2.2", "https://example.com/", None))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(harness.capture.calls(), 1);

    // Only the accepted URL verdict is cached; the failed analysis is not.
    let stats = harness.state.orchestrator.cache().stats();
    assert_eq!(stats.entries, 1);
    assert!(stats.keys[0].starts_with("url_validation:"));
}
