//! Refresh cycle integration tests
//!
//! 401 handling: one refresh, one replay, sign-out when either fails.

use crate::common::*;
use crate::{assert_api_status, assert_ok, assert_signed_out};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use storefront::client::{ApiError, ApiRequest, Config, RouteClassifier, SessionAuthenticator, SessionStorage, UserProjection};
use storefront::shared::AppConfig;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, Request, ResponseTemplate};

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/business/domain"))
        .and(header("authorization", bearer("tok1").as_str()))
        .respond_with(unauthorized("jwt expired"))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seller/business/domain"))
        .and(header("authorization", bearer("tok2").as_str()))
        .respond_with(json_ok(json!({ "domain": "shop.test" })))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 1).await;

    let response = assert_ok!(backend.auth.execute(ApiRequest::get("/seller/business/domain")).await);

    assert_eq!(response.body, json!({ "domain": "shop.test" }));
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok2"));
    assert_eq!(backend.cleared_count(), 0);
}

#[tokio::test]
async fn test_refreshed_session_is_persisted() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", bearer("tok1").as_str()))
        .respond_with(unauthorized("jwt expired"))
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", bearer("tok2").as_str()))
        .respond_with(json_ok(json!([])))
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 1).await;

    assert_ok!(backend.auth.execute(ApiRequest::get("/seller/orders")).await);

    let session = backend.store.get().await;
    assert_eq!(session.refresh_token.as_deref(), Some("ref2"));
    let user = session.user.expect("user from refresh response");
    assert_eq!(user.mobile_number.as_deref(), Some(TEST_MOBILE));

    let keys = backend.storage.keys().await;
    assert_eq!(keys, vec!["accessToken".to_string(), "user".to_string()]);
    assert_eq!(
        backend.storage.read("accessToken").await.unwrap().as_deref(),
        Some("tok2")
    );
    let raw = backend.storage.read("user").await.unwrap().expect("persisted user");
    let projection: UserProjection = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        serde_json::to_value(&projection).unwrap(),
        json!({
            "id": "u1",
            "name": "Asha",
            "role": ["OWNER", "MANAGER"],
            "permissions": ["orders.read"],
            "mobile_confirmed": true
        })
    );
}

#[tokio::test]
async fn test_replay_keeps_method_and_body() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;
    let product = json!({ "name": "Mango pickle", "price": 240 });

    Mock::given(method("POST"))
        .and(path("/seller/products"))
        .and(header("authorization", bearer("tok1").as_str()))
        .respond_with(unauthorized("jwt expired"))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/seller/products"))
        .and(header("authorization", bearer("tok2").as_str()))
        .and(body_json(product.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "p1" })))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 1).await;

    let request = ApiRequest::post("/seller/products").json(&product).unwrap();
    let response = assert_ok!(backend.auth.execute(request).await);

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.body, json!({ "id": "p1" }));
}

#[tokio::test]
async fn test_rejected_refresh_signs_out_with_original_error() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .respond_with(unauthorized("jwt expired"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(unauthorized("refresh token revoked"), 1).await;

    let body = assert_api_status!(backend.auth.execute(ApiRequest::get("/seller/orders")).await, 401);

    assert_eq!(body, json!({ "message": "jwt expired" }));
    assert_signed_out!(backend);
    assert_eq!(backend.cleared_count(), 1);
}

#[tokio::test]
async fn test_refresh_without_token_counts_as_rejected() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .respond_with(unauthorized("jwt expired"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend
        .mount_refresh(json_ok(json!({ "id": "u1", "access_token": "" })), 1)
        .await;

    assert_api_status!(backend.auth.execute(ApiRequest::get("/seller/orders")).await, 401);
    assert_signed_out!(backend);
}

#[tokio::test]
async fn test_second_unauthorized_is_final() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/settings"))
        .and(header("authorization", bearer("tok1").as_str()))
        .respond_with(unauthorized("jwt expired"))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seller/settings"))
        .and(header("authorization", bearer("tok2").as_str()))
        .respond_with(unauthorized("account suspended"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 1).await;

    let body = assert_api_status!(backend.auth.execute(ApiRequest::get("/seller/settings")).await, 401);

    assert_eq!(body, json!({ "message": "account suspended" }));
    assert_signed_out!(backend);
    assert_eq!(backend.cleared_count(), 1);
}

#[tokio::test]
async fn test_request_already_retried_is_not_refreshed() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .respond_with(unauthorized("jwt expired"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 0).await;

    let request = ApiRequest::get("/seller/orders").mark_retried();
    let body = assert_api_status!(backend.auth.execute(request).await, 401);

    assert_eq!(body, json!({ "message": "jwt expired" }));
    assert_signed_out!(backend);
}

#[tokio::test]
async fn test_exempt_path_unauthorized_passes_through() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(unauthorized("Invalid credentials"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 0).await;

    let request = ApiRequest::post("/login?next=/seller").json(&json!({ "mobile": TEST_MOBILE })).unwrap();
    assert_api_status!(backend.auth.execute(request).await, 401);

    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok1"));
    assert_eq!(backend.cleared_count(), 0);
}

#[tokio::test]
async fn test_custom_exempt_routes() {
    let backend = TestBackend::start_with(|builder| {
        builder.routes(RouteClassifier::default().with_refresh_exempt(["/store/bootstrap"]))
    })
    .await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/store/bootstrap"))
        .respond_with(unauthorized("guest"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 0).await;

    assert_api_status!(backend.auth.execute(ApiRequest::get("/store/bootstrap")).await, 401);
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok1"));
}

#[tokio::test]
async fn test_server_error_is_returned_unchanged() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/reports"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream timeout"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 0).await;

    let body = assert_api_status!(backend.auth.execute(ApiRequest::get("/seller/reports")).await, 500);

    assert_eq!(body, json!("upstream timeout"));
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok1"));
}

#[tokio::test]
async fn test_forbidden_does_not_refresh() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("DELETE"))
        .and(path("/seller/staff/7"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Owners only" })))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 0).await;

    let result = backend.auth.execute(ApiRequest::delete("/seller/staff/7")).await;
    let error = result.expect_err("403 is an error");
    assert_eq!(error.user_message(), "Owners only");
    assert_eq!(backend.cleared_count(), 0);
}

#[tokio::test]
async fn test_network_failure_is_returned() {
    let backend = TestBackend::start().await;
    let unreachable = Config::for_origin("http://127.0.0.1:9").unwrap();
    let auth = SessionAuthenticator::builder(unreachable, backend.store.clone()).build().unwrap();
    seed_session(&backend.store, "tok1").await;

    let result = auth.execute(ApiRequest::get("/seller/orders")).await;

    assert_matches!(result, Err(ApiError::Network { .. }));
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok1"));
}

#[tokio::test]
async fn test_request_timeout_is_applied() {
    let backend = TestBackend::start().await;
    let config = Config::with_builder(
        AppConfig::builder()
            .local_api_url(backend.server.uri())
            .request_timeout_secs(1),
    )
    .unwrap();
    let auth = SessionAuthenticator::builder(config, backend.store.clone()).build().unwrap();
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .respond_with(json_ok(json!([])).set_delay(Duration::from_secs(3)))
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 0).await;

    let result = auth.execute(ApiRequest::get("/seller/orders")).await;

    assert_matches!(result, Err(ApiError::Network { .. }));
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok1"));
}

#[tokio::test]
async fn test_gateway_send_does_not_refresh() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", bearer("tok1").as_str()))
        .respond_with(unauthorized("jwt expired"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok2"), 0).await;

    let result = backend.auth.gateway().send(&ApiRequest::get("/seller/orders")).await;

    let body = assert_api_status!(result, 401);
    assert_eq!(body, json!({ "message": "jwt expired" }));
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok1"));
    assert_eq!(backend.cleared_count(), 0);
}

#[tokio::test]
async fn test_seeded_cookie_reaches_refresh() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;
    let origin = reqwest::Url::parse(&backend.server.uri()).unwrap();
    backend
        .auth
        .gateway()
        .cookie_jar()
        .add_cookie_str("refreshToken=seeded; Path=/", &origin);

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", bearer("tok1").as_str()))
        .respond_with(unauthorized("jwt expired"))
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", bearer("tok2").as_str()))
        .respond_with(json_ok(json!([])))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH))
        .and(header("cookie", "refreshToken=seeded"))
        .respond_with(refresh_ok("tok2"))
        .expect(1)
        .mount(&backend.server)
        .await;

    assert_ok!(backend.auth.execute(ApiRequest::get("/seller/orders")).await);
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok2"));
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let backend = TestBackend::start().await;

    Mock::given(method("GET"))
        .and(path("/store/catalog"))
        .and(|request: &Request| !request.headers.contains_key("authorization"))
        .respond_with(json_ok(json!({ "items": [] })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let response = assert_ok!(backend.auth.execute(ApiRequest::get("/store/catalog?page=1")).await);
    assert_eq!(response.body, json!({ "items": [] }));
}

#[tokio::test]
async fn test_explicit_refresh_without_access_token() {
    let backend = TestBackend::start().await;
    backend.mount_refresh(refresh_ok("tok2"), 1).await;

    assert!(backend.api().refresh_session().await);

    let session = backend.store.get().await;
    assert_eq!(session.access_token.as_deref(), Some("tok2"));
    assert_eq!(session.user.map(|user| user.id), Some(TEST_USER_ID.to_string()));
}

#[tokio::test]
async fn test_explicit_refresh_rejected() {
    let backend = TestBackend::start().await;
    seed_session(&backend.store, "tok1").await;
    backend.mount_refresh(unauthorized("refresh token expired"), 1).await;

    assert!(!backend.api().refresh_session().await);
    assert_signed_out!(backend);
    assert_eq!(backend.cleared_count(), 1);
}

#[tokio::test]
async fn test_custom_refresh_path() {
    let backend = TestBackend::start_with(|builder| builder.refresh_path("/session/renew")).await;
    seed_session(&backend.store, "tok1").await;

    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", bearer("tok1").as_str()))
        .respond_with(unauthorized("jwt expired"))
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seller/orders"))
        .and(header("authorization", bearer("tok2").as_str()))
        .respond_with(json_ok(json!([])))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session/renew"))
        .respond_with(refresh_ok("tok2"))
        .expect(1)
        .mount(&backend.server)
        .await;
    backend.mount_refresh(refresh_ok("tok3"), 0).await;

    assert_ok!(backend.auth.execute(ApiRequest::get("/seller/orders")).await);
    assert_eq!(backend.store.access_token().await.as_deref(), Some("tok2"));
}
