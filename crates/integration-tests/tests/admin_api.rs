//! Admin API request handling that completes before any database access.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use cobbler_admin::models::CurrentAdmin;
use cobbler_admin::services::JwtService;
use cobbler_core::{AdminRole, AdminUserId, Email};
use cobbler_integration_tests::{
    WEBHOOK_SECRET, admin_app, admin_config, get, json_request, send, sign_webhook,
    unreachable_pool, webhook_request,
};

fn token_for(role: AdminRole) -> String {
    let admin = CurrentAdmin {
        id: AdminUserId::new(7),
        email: Email::parse("lasts@cobbler.test").unwrap(),
        name: "Lasts Team".to_string(),
        role,
    };
    JwtService::new(&admin_config().jwt)
        .issue(&admin)
        .unwrap()
        .token
}

#[tokio::test]
async fn test_health_echoes_request_id() {
    let app = admin_app(unreachable_pool());
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-admin-42")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "ok");
    assert_eq!(response.header("x-request-id"), Some("req-admin-42"));
}

#[tokio::test]
async fn test_health_generates_request_id() {
    let app = admin_app(unreachable_pool());

    let response = send(&app, get("/health")).await;

    let id = response.header("x-request-id").unwrap();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_readiness_fails_without_database() {
    let app = admin_app(unreachable_pool());

    let response = send(&app, get("/health/ready")).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_catalog_requires_authentication() {
    let app = admin_app(unreachable_pool());

    let response = send(&app, get("/api/products")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.json()["error"].is_string());

    let response = send(&app, json_request("POST", "/api/sync", &json!({}), None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_bearer_token_is_rejected() {
    let app = admin_app(unreachable_pool());

    let response = send(
        &app,
        json_request("GET", "/api/options/sizes", &json!({}), Some("not.a.jwt")),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let app = admin_app(unreachable_pool());
    let mut config = admin_config().jwt;
    config.secret = secrecy::SecretString::from("some-other-signing-secret-0123456789");
    let admin = CurrentAdmin {
        id: AdminUserId::new(7),
        email: Email::parse("lasts@cobbler.test").unwrap(),
        name: "Lasts Team".to_string(),
        role: AdminRole::SuperAdmin,
    };
    let forged = JwtService::new(&config).issue(&admin).unwrap().token;

    let response = send(
        &app,
        json_request("GET", "/api/options/sizes", &json!({}), Some(&forged)),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_option_category_is_not_found() {
    let app = admin_app(unreachable_pool());
    let token = token_for(AdminRole::Viewer);

    let response = send(
        &app,
        json_request("GET", "/api/options/laces", &json!({}), Some(&token)),
    )
    .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_viewer_cannot_start_sync() {
    let app = admin_app(unreachable_pool());
    let token = token_for(AdminRole::Viewer);

    let response = send(
        &app,
        json_request("POST", "/api/sync", &json!({}), Some(&token)),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_webhook_without_signature_is_rejected() {
    let app = admin_app(unreachable_pool());

    let response = send(
        &app,
        webhook_request("products/update", r#"{"id":1}"#, None),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_with_wrong_signature_is_rejected() {
    let app = admin_app(unreachable_pool());
    let body = r#"{"id":1}"#;
    let signature = sign_webhook("not-the-webhook-secret", body.as_bytes());

    let response = send(
        &app,
        webhook_request("products/update", body, Some(&signature)),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_non_catalog_webhook_is_acknowledged() {
    let app = admin_app(unreachable_pool());
    let body = r#"{"id":450789469}"#;
    let signature = sign_webhook(WEBHOOK_SECRET, body.as_bytes());

    let response = send(
        &app,
        webhook_request("orders/create", body, Some(&signature)),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_resolve_rejects_non_numeric_option_id() {
    let app = admin_app(unreachable_pool());
    let token = token_for(AdminRole::Viewer);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/products/3/resolve",
            &json!({ "size": "nine", "laces": "waxed" }),
            Some(&token),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().contains("nine"));
}

#[tokio::test]
async fn test_product_by_handle_rejects_malformed_handle() {
    let app = admin_app(unreachable_pool());
    let token = token_for(AdminRole::Viewer);

    let response = send(
        &app,
        json_request(
            "GET",
            "/api/products/by-handle/Chelsea_Boot!",
            &json!({}),
            Some(&token),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
