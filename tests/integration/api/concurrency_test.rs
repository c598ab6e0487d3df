//! Single-flight refresh tests
//!
//! Concurrent requests rejected under the same refresh generation must share
//! one refresh call, whether or not they carried a token.

use crate::assert_signed_out;
use crate::common::*;
use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use storefront::client::{ApiRequest, RefreshOutcome};
use wiremock::matchers::{header, method, path};
use wiremock::Mock;

const CONCURRENT_CALLS: u64 = 4;

#[tokio::test]
async fn test_concurrent_unauthorized_share_one_refresh() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(unauthorized("jwt expired"))
        .expect(CONCURRENT_CALLS)
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", "Bearer tok2"))
        .respond_with(json_ok(json!({ "orders": [] })))
        .expect(CONCURRENT_CALLS)
        .mount(&backend.server)
        .await;
    backend
        .mount_refresh(slow_refresh_ok("tok2", Duration::from_millis(200)), 1)
        .await;

    let calls = (0..CONCURRENT_CALLS).map(|_| backend.auth.execute(ApiRequest::get("/seller/orders")));
    let results = join_all(calls).await;

    for result in results {
        let response = result.expect("replayed request succeeds");
        assert_eq!(response.body, json!({ "orders": [] }));
    }
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok2"));
}

#[tokio::test]
async fn test_concurrent_unauthorized_after_rejected_refresh() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .respond_with(unauthorized("jwt expired"))
        .expect(CONCURRENT_CALLS)
        .mount(&backend.server)
        .await;
    backend
        .mount_refresh(unauthorized("refresh token revoked").set_delay(Duration::from_millis(200)), 1)
        .await;

    let calls = (0..CONCURRENT_CALLS).map(|_| backend.auth.execute(ApiRequest::get("/seller/orders")));
    let results = join_all(calls).await;

    for result in results {
        let error = result.expect_err("session is gone");
        assert_eq!(error.user_message(), "jwt expired");
    }
    assert_signed_out!(backend);
    assert_eq!(backend.cleared_count(), 1);
}

#[tokio::test]
async fn test_concurrent_unauthorized_without_token_refresh_once() {
    let backend = TestBackend::start().await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .respond_with(unauthorized("jwt must be provided"))
        .expect(CONCURRENT_CALLS)
        .mount(&backend.server)
        .await;
    backend
        .mount_refresh(unauthorized("refresh token missing").set_delay(Duration::from_millis(150)), 1)
        .await;

    let calls = (0..CONCURRENT_CALLS).map(|_| backend.auth.execute(ApiRequest::get("/seller/orders")));
    let results = join_all(calls).await;

    for result in results {
        let error = result.expect_err("no session to refresh");
        assert_eq!(error.user_message(), "jwt must be provided");
    }
    assert_signed_out!(backend);
    assert_eq!(backend.cleared_count(), 1);
}

#[tokio::test]
async fn test_refresh_session_after_coalesced_refresh_calls_again() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(unauthorized("jwt expired"))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", "Bearer tok2"))
        .respond_with(json_ok(json!({ "orders": [] })))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 2).await;

    backend
        .auth
        .execute(ApiRequest::get("/seller/orders"))
        .await
        .expect("replayed request succeeds");
    let outcome = backend.auth.refresh_session().await;

    assert_eq!(outcome, RefreshOutcome::Refreshed);
    assert_eq!(backend.cleared_count(), 0);
}

#[tokio::test]
async fn test_different_paths_share_one_refresh() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    for route in ["/seller/orders", "/seller/products", "/seller/business/domain"] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(unauthorized("jwt expired"))
            .expect(1)
            .mount(&backend.server)
            .await;
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", "Bearer tok2"))
            .respond_with(json_ok(json!({ "path": route })))
            .expect(1)
            .mount(&backend.server)
            .await;
    }
    backend
        .mount_refresh(slow_refresh_ok("tok2", Duration::from_millis(150)), 1)
        .await;

    let (orders, products, domain) = tokio::join!(
        backend.auth.execute(ApiRequest::get("/seller/orders")),
        backend.auth.execute(ApiRequest::get("/seller/products")),
        backend.auth.execute(ApiRequest::get("/seller/business/domain")),
    );

    assert_eq!(orders.unwrap().body, json!({ "path": "/seller/orders" }));
    assert_eq!(products.unwrap().body, json!({ "path": "/seller/products" }));
    assert_eq!(domain.unwrap().body, json!({ "path": "/seller/business/domain" }));
}
