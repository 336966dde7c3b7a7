//! Admin surface: authentication and cache management.

use axum::http::StatusCode;

mod common;
use common::{admin_request, body_json, png, upload_request, url_request, Harness, ADMIN_KEY};

#[tokio::test]
async fn test_admin_requires_bearer_key() {
    let harness = Harness::new(common::test_config());

    let missing = harness.send(admin_request("GET", "/admin/cache", None)).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = harness
        .send(admin_request("GET", "/admin/cache", Some("guess")))
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = harness
        .send(admin_request("GET", "/admin/cache", Some(ADMIN_KEY)))
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_routes_absent_when_disabled() {
    let mut config = common::test_config();
    config.admin.enabled = false;
    let harness = Harness::new(config);

    let response = harness
        .send(admin_request("GET", "/admin/cache", Some(ADMIN_KEY)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalidate_by_pattern_forces_fresh_analysis() {
    let harness = Harness::new(common::test_config());
    let image = png(300, 200, 1024);
    let upload = || upload_request("192.0.2.80", "shot.png", "image/png", &image, None);

    assert_eq!(harness.send(upload()).await.status(), StatusCode::OK);
    assert_eq!(
        harness
            .send(url_request("192.0.2.80", "https://example.com/", None))
            .await
            .status(),
        StatusCode::OK
    );

    let stats = body_json(
        harness
            .send(admin_request("GET", "/admin/cache", Some(ADMIN_KEY)))
            .await,
    )
    .await;
    // upload analysis, URL analysis, URL verdict
    assert_eq!(stats["entries"], 3);

    let removed = body_json(
        harness
            .send(admin_request("DELETE", "/admin/cache?pattern=upload_analysis", Some(ADMIN_KEY)))
            .await,
    )
    .await;
    assert_eq!(removed["removed"], 1);
    assert_eq!(removed["pattern"], "upload_analysis");

    let again = body_json(harness.send(upload()).await).await;
    assert_eq!(again["from_cache"], false);
    assert_eq!(harness.analyzer.calls(), 3);
}

#[tokio::test]
async fn test_clear_all_and_rate_limit_summary() {
    let harness = Harness::new(common::test_config());
    harness
        .send(url_request("192.0.2.81", "https://example.com/a", None))
        .await;
    harness
        .send(url_request("192.0.2.82", "https://example.com/b", None))
        .await;

    let limits = body_json(
        harness
            .send(admin_request("GET", "/admin/rate-limits", Some(ADMIN_KEY)))
            .await,
    )
    .await;
    assert_eq!(limits["tracked_windows"], 2);

    let cleared = body_json(
        harness
            .send(admin_request("DELETE", "/admin/cache", Some(ADMIN_KEY)))
            .await,
    )
    .await;
    assert_eq!(cleared["removed"], 4);
    assert!(cleared["pattern"].is_null());
    assert!(harness.state.orchestrator.cache().is_empty());
}
