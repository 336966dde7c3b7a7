//! Concurrent admission under load.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tower::ServiceExt;

mod common;
use common::{url_request, FakeAnalyzer, Harness};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_respect_limit() {
    let harness = Arc::new(Harness::with_analyzer(
        common::test_config(),
        FakeAnalyzer::slow(Duration::from_millis(20)),
    ));

    let mut handles = Vec::new();
    for n in 0..40 {
        let router = harness.router.clone();
        handles.push(tokio::spawn(async move {
            let request = url_request("192.0.2.50", &format!("https://example.com/p/{n}"), None);
            router.oneshot(request).await.unwrap().status()
        }));
    }

    let mut ok = 0;
    let mut limited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 5);
    assert_eq!(limited, 35);
    assert_eq!(harness.analyzer.calls(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_clients_are_isolated() {
    let harness = Arc::new(Harness::new(common::test_config()));

    let mut handles = Vec::new();
    for client in 0..20 {
        for _ in 0..5 {
            let router = harness.router.clone();
            handles.push(tokio::spawn(async move {
                let request = url_request(
                    &format!("192.0.2.{client}"),
                    "https://example.com/shared",
                    None,
                );
                router.oneshot(request).await.unwrap().status()
            }));
        }
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(harness.state.orchestrator.limiter().tracked(), 20);
}
