//! Email verification and unsubscribe flow tests

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{SECRET_A, TestApp, test_config};

/// Pull a link's token out of an email body
fn token_after(text: &str, path: &str) -> String {
    let start = text.find(path).unwrap() + path.len();
    text[start..]
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_verification_flow() {
    let app = TestApp::new(test_config());

    let (status, body) = app
        .call(
            "POST",
            "/api/email/verification",
            SECRET_A,
            Some(json!({ "email": "  Owner@Example.com " })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({ "status": "sent", "email": "owner@example.com" }));

    let sent = app.mailer.last().unwrap();
    assert_eq!(sent.to, "owner@example.com");
    assert!(sent.text.contains("https://pitch.test/api/email/verify?token="));
    assert!(sent.html.contains("/api/email/unsubscribe?token="));
    assert!(!app.state.email.is_verified("owner@example.com").await.unwrap());

    let token = token_after(&sent.text, "/api/email/verify?token=");
    let response = app
        .get_public(&format!("/api/email/verify?token={token}"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::json_body(response).await,
        json!({ "status": "verified", "email": "owner@example.com" })
    );
    assert!(app.state.email.is_verified("owner@example.com").await.unwrap());
}

#[tokio::test]
async fn test_unsubscribe_blocks_further_mail() {
    let app = TestApp::new(test_config());
    app.call(
        "POST",
        "/api/email/verification",
        SECRET_A,
        Some(json!({ "email": "visitor@example.com" })),
    )
    .await;
    let sent = app.mailer.last().unwrap();
    let token = token_after(&sent.text, "/api/email/unsubscribe?token=");

    let response = app
        .get_public(&format!("/api/email/unsubscribe?token={token}"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::json_body(response).await["status"],
        "unsubscribed"
    );

    let (status, body) = app
        .call(
            "POST",
            "/api/email/verification",
            SECRET_A,
            Some(json!({ "email": "visitor@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert_eq!(app.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_token_purpose_is_enforced() {
    let app = TestApp::new(test_config());
    app.call(
        "POST",
        "/api/email/verification",
        SECRET_A,
        Some(json!({ "email": "visitor@example.com" })),
    )
    .await;
    let sent = app.mailer.last().unwrap();
    let verify_token = token_after(&sent.text, "/api/email/verify?token=");

    let response = app
        .get_public(&format!("/api/email/unsubscribe?token={verify_token}"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get_public("/api/email/verify?token=garbage").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get_public("/api/email/verify").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_address_rejected() {
    let app = TestApp::new(test_config());
    let (status, body) = app
        .call(
            "POST",
            "/api/email/verification",
            SECRET_A,
            Some(json!({ "email": "not-an-address" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(app.mailer.last().is_none());
}

#[tokio::test]
async fn test_email_not_configured() {
    let mut config = test_config();
    config.email.token_secret = None;
    let app = TestApp::new(config);

    let (status, body) = app
        .call(
            "POST",
            "/api/email/verification",
            SECRET_A,
            Some(json!({ "email": "owner@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "not_configured");

    let response = app.get_public("/api/email/verify?token=abc").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_verification_requires_auth() {
    let app = TestApp::new(test_config());
    let (status, _) = app
        .call(
            "POST",
            "/api/email/verification",
            "wrong",
            Some(json!({ "email": "owner@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
