//! Voices list and caching tests

mod common;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{SECRET_A, TestApp, test_config};

#[tokio::test]
async fn test_voices_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/voices"))
        .and(header("xi-api-key", "el-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voices": [{
                "voice_id": "abc123",
                "name": "Rachel",
                "preview_url": "https://cdn.example.com/rachel.mp3",
                "labels": { "gender": "female", "accent": "american" },
                "verified_languages": [{ "language": "en", "accent": "american" }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::with_providers(test_config(), &server.uri(), None);

    let (status, first) = app.call("GET", "/api/voices", SECRET_A, None).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["cached"], false);
    assert_eq!(first["voices"][0]["id"], "abc123");
    assert_eq!(first["voices"][0]["gender"], "Female");
    assert_eq!(first["voices"][0]["sample"], "https://cdn.example.com/rachel.mp3");

    let (status, second) = app.call("GET", "/api/voices", SECRET_A, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert_eq!(second["voices"], first["voices"]);
}

#[tokio::test]
async fn test_voices_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/voices"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let app = TestApp::with_providers(test_config(), &server.uri(), None);
    let (status, body) = app.call("GET", "/api/voices", SECRET_A, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_error");
}

#[tokio::test]
async fn test_voices_from_fake_provider() {
    let app = TestApp::new(test_config());
    let (status, body) = app.call("GET", "/api/voices", SECRET_A, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["voices"][0]["name"], "Test Voice");
}
