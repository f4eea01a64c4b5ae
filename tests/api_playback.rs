//! Audio generation, playback selection and widget tests

mod common;

use std::time::Duration;

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::{Value, json};

use common::{SECRET_A, SECRET_B, TestApp, test_config};

const DEFAULT_VOICE: &str = "21m00Tcm4TlvDq8Ikk0Y";

async fn add_segment(app: &TestApp, project_id: &str, condition: Value, script: &str) -> String {
    let (status, segment) = app
        .call(
            "POST",
            &format!("/api/projects/{project_id}/segments"),
            SECRET_A,
            Some(json!({ "condition": condition, "script": script })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{segment}");
    segment["id"].as_str().unwrap().to_string()
}

async fn generate_audio(app: &TestApp, project_id: &str, segment_id: &str) -> (StatusCode, Value) {
    app.call(
        "POST",
        &format!("/api/projects/{project_id}/segments/{segment_id}/audio"),
        SECRET_A,
        None,
    )
    .await
}

async fn set_voice(app: &TestApp, project_id: &str, voice: &str) -> StatusCode {
    let (status, _) = app
        .call(
            "PATCH",
            &format!("/api/projects/{project_id}"),
            SECRET_A,
            Some(json!({ "voiceId": voice })),
        )
        .await;
    status
}

/// A project with audio for every kind of segment
async fn voiced_project(app: &TestApp) -> (String, Vec<String>) {
    let project = app.create_project(SECRET_A, "Acme").await;
    let id = project["id"].as_str().unwrap().to_string();
    let new_visitor = project["segments"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            "PATCH",
            &format!("/api/projects/{id}/segments/{new_visitor}"),
            SECRET_A,
            Some(json!({ "script": "Hello and welcome to Acme." })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let utm = add_segment(
        app,
        &id,
        json!({ "type": "utm_source", "source": "newsletter" }),
        "Thanks for reading the newsletter.",
    )
    .await;
    let returning = add_segment(
        app,
        &id,
        json!({ "type": "returning_visitor" }),
        "Welcome back to Acme.",
    )
    .await;
    let french = add_segment(
        app,
        &id,
        json!({ "type": "language", "language": "fr" }),
        "Bienvenue chez Acme.",
    )
    .await;

    let segments = vec![new_visitor, utm, returning, french];
    for segment in &segments {
        let (status, body) = generate_audio(app, &id, segment).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    (id, segments)
}

async fn playback(app: &TestApp, query: &str, accept_language: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(format!("/api/playback?{query}"));
    if let Some(lang) = accept_language {
        builder = builder.header("accept-language", lang);
    }
    let response = app.send(builder.body(Body::empty()).unwrap()).await;
    let status = response.status();
    (status, common::json_body(response).await)
}

#[tokio::test]
async fn test_generate_audio_and_cache_hit() {
    let app = TestApp::new(test_config());
    let (id, segments) = voiced_project(&app).await;
    assert_eq!(app.tts.calls(), 4);

    let (status, body) = generate_audio(&app, &id, &segments[0]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], true);
    let hash = body["segment"]["audioHash"].as_str().unwrap();
    assert_eq!(
        body["audioUrl"],
        format!("https://pitch.test/api/audio/{id}/{}?v={hash}", segments[0])
    );
    assert_eq!(app.tts.calls(), 4);
}

#[tokio::test]
async fn test_conflicting_generation_keeps_current_audio() {
    let app = TestApp::new(test_config());
    let (id, segments) = voiced_project(&app).await;

    // The slow synthesis runs for voiceB; the voice is switched back meanwhile
    assert_eq!(set_voice(&app, &id, "voiceB").await, StatusCode::OK);
    app.tts.set_delay(Duration::from_millis(300));
    let generate = generate_audio(&app, &id, &segments[0]);
    let revert = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        set_voice(&app, &id, DEFAULT_VOICE).await
    };
    let ((generated, _), reverted) = tokio::join!(generate, revert);
    assert_eq!(reverted, StatusCode::OK);
    assert_eq!(generated, StatusCode::CONFLICT);
    app.tts.set_delay(Duration::ZERO);

    let (status, body) = generate_audio(&app, &id, &segments[0]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], true);

    let response = app
        .get_public(&format!("/api/audio/{id}/{}", segments[0]))
        .await;
    let audio = common::body_bytes(response).await;
    assert_eq!(
        &audio[..],
        format!("MP3:{DEFAULT_VOICE}:en:Hello and welcome to Acme.").as_bytes()
    );
}

#[tokio::test]
async fn test_regenerated_audio_replaces_old_object() {
    let app = TestApp::new(test_config());
    let (id, segments) = voiced_project(&app).await;
    let (_, project) = app
        .call("GET", &format!("/api/projects/{id}"), SECRET_A, None)
        .await;
    let old_key = project["segments"][0]["audioKey"].as_str().unwrap().to_string();

    assert_eq!(set_voice(&app, &id, "otherVoice").await, StatusCode::OK);
    let (status, body) = generate_audio(&app, &id, &segments[0]).await;
    assert_eq!(status, StatusCode::OK);
    let new_key = body["segment"]["audioKey"].as_str().unwrap();

    assert_ne!(old_key, new_key);
    assert!(app.state.audio.get(&old_key).await.unwrap().is_none());
    assert!(app.state.audio.get(new_key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_generate_audio_requires_script() {
    let app = TestApp::new(test_config());
    let project = app.create_project(SECRET_A, "Acme").await;
    let id = project["id"].as_str().unwrap();
    let segment = project["segments"][0]["id"].as_str().unwrap();

    let (status, body) = generate_audio(&app, id, segment).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(app.tts.calls(), 0);
}

#[tokio::test]
async fn test_voice_change_regenerates_audio() {
    let app = TestApp::new(test_config());
    let (id, segments) = voiced_project(&app).await;

    let (status, _) = app
        .call(
            "PATCH",
            &format!("/api/projects/{id}"),
            SECRET_A,
            Some(json!({ "voiceId": "otherVoice" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = generate_audio(&app, &id, &segments[0]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], false);
    assert_eq!(app.tts.calls(), 5);

    let response = app
        .get_public(&format!("/api/audio/{id}/{}", segments[0]))
        .await;
    let audio = common::body_bytes(response).await;
    assert_eq!(&audio[..], b"MP3:otherVoice:en:Hello and welcome to Acme.");
}

#[tokio::test]
async fn test_playback_selection_rules() {
    let app = TestApp::new(test_config());
    let (id, segments) = voiced_project(&app).await;

    let (status, body) = playback(&app, &format!("projectId={id}&utm_source=newsletter"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["segmentId"], segments[1]);
    assert_eq!(body["reason"], "utm_source");

    let (_, body) = playback(&app, &format!("projectId={id}&returning=true"), Some("fr")).await;
    assert_eq!(body["segmentId"], segments[2]);
    assert_eq!(body["reason"], "returning_visitor");

    let (_, body) = playback(&app, &format!("projectId={id}"), Some("fr-CH, fr;q=0.9, en;q=0.8")).await;
    assert_eq!(body["segmentId"], segments[3]);
    assert_eq!(body["reason"], "language");
    assert_eq!(body["language"], "fr");
    assert_eq!(body["script"], "Bienvenue chez Acme.");

    // An explicit lang parameter overrides the header
    let (_, body) = playback(&app, &format!("projectId={id}&lang=de"), Some("fr")).await;
    assert_eq!(body["segmentId"], segments[0]);
    assert_eq!(body["reason"], "new_visitor");

    let (_, body) = playback(&app, &format!("projectId={id}&utm_source=unknown"), None).await;
    assert_eq!(body["reason"], "new_visitor");
    assert_eq!(body["projectId"], id.as_str());
    let (_, project) = app
        .call("GET", &format!("/api/projects/{id}"), SECRET_A, None)
        .await;
    let hash = project["segments"][0]["audioHash"].as_str().unwrap();
    assert_eq!(
        body["audioUrl"],
        format!("https://pitch.test/api/audio/{id}/{}?v={hash}", segments[0])
    );
}

#[tokio::test]
async fn test_audio_url_changes_with_new_audio() {
    let app = TestApp::new(test_config());
    let (id, segments) = voiced_project(&app).await;
    let (_, before) = playback(&app, &format!("projectId={id}"), None).await;

    app.call(
        "PATCH",
        &format!("/api/projects/{id}/segments/{}", segments[0]),
        SECRET_A,
        Some(json!({ "script": "Hello again from Acme." })),
    )
    .await;
    let (status, _) = generate_audio(&app, &id, &segments[0]).await;
    assert_eq!(status, StatusCode::OK);

    let (_, after) = playback(&app, &format!("projectId={id}"), None).await;
    assert_eq!(after["segmentId"], segments[0]);
    assert_ne!(before["audioUrl"], after["audioUrl"]);
}

#[tokio::test]
async fn test_playback_skips_segments_without_audio() {
    let app = TestApp::new(test_config());
    let (id, segments) = voiced_project(&app).await;

    // Editing the script drops the stale audio
    let (status, segment) = app
        .call(
            "PATCH",
            &format!("/api/projects/{id}/segments/{}", segments[1]),
            SECRET_A,
            Some(json!({ "script": "A brand new newsletter pitch." })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(segment.get("audioKey").is_none());

    let (_, body) = playback(&app, &format!("projectId={id}&utm_source=newsletter"), None).await;
    assert_eq!(body["reason"], "new_visitor");
}

#[tokio::test]
async fn test_playback_not_found_cases() {
    let app = TestApp::new(test_config());

    let (status, _) = playback(&app, "projectId=missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let project = app.create_project(SECRET_B, "Silent").await;
    let (status, _) = playback(&app, &format!("projectId={}", project["id"].as_str().unwrap()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = playback(&app, "utm_source=x", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_playback_allows_any_origin() {
    let app = TestApp::new(test_config());
    let (id, _) = voiced_project(&app).await;

    let request = Request::builder()
        .uri(format!("/api/playback?projectId={id}"))
        .header("origin", "https://customer-site.example")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_stream_audio() {
    let app = TestApp::new(test_config());
    let (id, segments) = voiced_project(&app).await;
    let uri = format!("/api/audio/{id}/{}", segments[3]);

    let response = app.get_public(&uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers.get("content-type").unwrap(), "audio/mpeg");
    assert_eq!(
        headers.get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    let etag = headers.get("etag").unwrap().clone();
    let audio = common::body_bytes(response).await;
    assert_eq!(
        &audio[..],
        format!("MP3:{DEFAULT_VOICE}:fr:Bienvenue chez Acme.").as_bytes()
    );

    let request = Request::builder()
        .uri(&uri)
        .header("if-none-match", etag)
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_stream_audio_missing() {
    let app = TestApp::new(test_config());
    let project = app.create_project(SECRET_A, "Acme").await;
    let id = project["id"].as_str().unwrap();
    let segment = project["segments"][0]["id"].as_str().unwrap();

    let response = app.get_public(&format!("/api/audio/{id}/{segment}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get_public(&format!("/api/audio/{id}/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_project_removes_audio() {
    let app = TestApp::new(test_config());
    let (id, _) = voiced_project(&app).await;
    let (_, project) = app
        .call("GET", &format!("/api/projects/{id}"), SECRET_A, None)
        .await;
    let key = project["segments"][0]["audioKey"].as_str().unwrap().to_string();
    assert!(app.state.audio.get(&key).await.unwrap().is_some());

    let (status, _) = app
        .call("DELETE", &format!("/api/projects/{id}"), SECRET_A, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.state.audio.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_widget_script() {
    let app = TestApp::new(test_config());
    let response = app.get_public("/widget.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("application/javascript")
    );
    let body = common::body_bytes(response).await;
    let script = String::from_utf8(body.to_vec()).unwrap();
    assert!(script.contains("/api/playback"));
}
