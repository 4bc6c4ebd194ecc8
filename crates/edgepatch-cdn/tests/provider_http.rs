//! # HTTP tests for the CDN purge clients
//!
//! Runs the Cloudflare and Fastly clients against wiremock servers to check
//! request shape, batching, tracking ids and error propagation.

use std::time::Duration;

use edgepatch_cdn::{
    CdnClient, CdnError, CloudflareClient, FastlyClient, InvalidationStatus, RetryPolicy,
};
use edgepatch_core::CdnProviderConfig;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

fn cloudflare(server: &MockServer) -> CloudflareClient {
    CloudflareClient::new(CdnProviderConfig {
        api_base_url: Some(Url::parse(&server.uri()).unwrap()),
        api_token: Some(Zeroizing::new("cf-token".into())),
        zone_id: Some("zone-9".into()),
        public_base_url: Some(Url::parse("https://edge.example.net/").unwrap()),
        timeout_secs: Some(5),
        ..Default::default()
    })
    .expect("client build")
}

fn fastly(server: &MockServer) -> FastlyClient {
    FastlyClient::new(CdnProviderConfig {
        api_base_url: Some(Url::parse(&server.uri()).unwrap()),
        api_token: Some(Zeroizing::new("fastly-key".into())),
        service_id: Some("svc-1".into()),
        timeout_secs: Some(5),
        ..Default::default()
    })
    .expect("client build")
}

// ── Cloudflare ───────────────────────────────────────────────────────────

#[tokio::test]
async fn cloudflare_batches_absolute_urls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/zones/zone-9/purge_cache"))
        .and(header("Authorization", "Bearer cf-token"))
        .and(body_json(serde_json::json!({
            "files": [
                "https://edge.example.net/opportunities/example.com/abc",
                "https://edge.example.net/opportunities/example.com/def"
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "errors": [],
            "result": {"id": "purge-123"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = cloudflare(&server)
        .invalidate_cache(&[
            "opportunities/example.com/abc".to_string(),
            "/opportunities/example.com/def".to_string(),
        ])
        .await
        .expect("purge");

    assert_eq!(result.status, InvalidationStatus::Success);
    assert_eq!(result.provider, "cloudflare");
    assert_eq!(result.tracking_id.as_deref(), Some("purge-123"));
    assert_eq!(result.estimated_seconds, Some(30));
    assert_eq!(
        result.paths,
        vec!["/opportunities/example.com/abc", "/opportunities/example.com/def"]
    );
}

#[tokio::test]
async fn cloudflare_empty_paths_make_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = cloudflare(&server).invalidate_cache(&[]).await.unwrap();
    assert_eq!(result.status, InvalidationStatus::Skipped);
}

#[tokio::test]
async fn cloudflare_http_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-9/purge_cache"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let err = cloudflare(&server)
        .invalidate_cache(&["/x".to_string()])
        .await
        .unwrap_err();
    match err {
        CdnError::Api { status, body, .. } => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn cloudflare_success_false_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{"code": 1012, "message": "Request must contain one of purge_everything, files, tags"}]
        })))
        .mount(&server)
        .await;

    let err = cloudflare(&server)
        .invalidate_cache(&["/x".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, CdnError::Rejected { ref message, .. } if message.starts_with("1012")));
}

// ── Fastly ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn fastly_purges_surrogate_keys() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/svc-1/purge"))
        .and(header("Fastly-Key", "fastly-key"))
        .and(header("Surrogate-Key", "/a /b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "/a": "108-1391560174-974124",
            "/b": "108-1391560174-974125"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = fastly(&server)
        .invalidate_cache(&["a".to_string(), "/b".to_string()])
        .await
        .expect("purge");

    assert!(result.is_success());
    assert_eq!(result.estimated_seconds, Some(5));
    assert_eq!(
        result.tracking_id.as_deref(),
        Some("108-1391560174-974124,108-1391560174-974125")
    );
}

#[tokio::test]
async fn fastly_server_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fastly(&server)
        .invalidate_cache(&["/a".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, CdnError::Api { status: 500, .. }));
}

#[tokio::test]
async fn rate_limited_purge_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "errors": [],
            "result": {"id": "purge-2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = cloudflare(&server)
        .with_retry(RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        })
        .invalidate_cache(&["/a".to_string()])
        .await
        .unwrap();
    assert_eq!(result.tracking_id.as_deref(), Some("purge-2"));
}

#[tokio::test]
async fn fastly_gives_up_after_its_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = fastly(&server)
        .with_retry(RetryPolicy::NONE)
        .invalidate_cache(&["/a".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, CdnError::Api { status: 503, .. }));
}
