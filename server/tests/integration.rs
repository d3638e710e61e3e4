//! Integration tests for the HTTP surface

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use common::*;

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_header() {
    let app = create_test_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let request_id = response.headers().get("x-request-id").unwrap();
    assert_eq!(request_id.len(), 36);
}

#[tokio::test]
async fn test_list_categories() {
    let app = create_test_app();
    let (status, body) = app.get("/categories").await;
    assert_eq!(status, StatusCode::OK);

    let categories = body.as_array().unwrap();
    assert_eq!(categories.len(), 15);
    let library = categories.iter().find(|c| c["key"] == "RITMOS").unwrap();
    assert_eq!(library["generatable"], false);
    assert!(categories
        .iter()
        .filter(|c| c["key"] != "RITMOS")
        .all(|c| c["generatable"] == true && !c["topics"].as_array().unwrap().is_empty()));
}

#[tokio::test]
async fn test_rhythm_filter() {
    let app = create_test_app();
    let (_, all) = app.get("/rhythms").await;
    assert_eq!(all.as_array().unwrap().len(), 15);

    let (status, drill) = app.get("/api/rhythms?q=drill").await;
    assert_eq!(status, StatusCode::OK);
    let drill = drill.as_array().unwrap();
    assert!(!drill.is_empty() && drill.len() < 15);
    assert!(drill.iter().all(|r| {
        let text = format!("{} {}", r["name"], r["description"]).to_lowercase();
        text.contains("drill")
    }));
}

#[tokio::test]
async fn test_list_archetypes() {
    let app = create_test_app();
    let (status, body) = app.get("/archetypes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_style_update() {
    let app = create_test_app();
    let (_, style) = app.get("/style").await;
    assert_eq!(style["zeus"], false);
    assert!(style["rhythm"].is_null());

    let (_, archetypes) = app.get("/archetypes").await;
    let archetype = archetypes[1]["name"].clone();
    let (_, rhythms) = app.get("/rhythms").await;
    let rhythm = rhythms[0]["name"].clone();

    let (status, updated) = app
        .put("/style", json!({ "rhythm": rhythm, "archetype": archetype, "zeus": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["archetype"]["name"], archetype);
    assert_eq!(updated["rhythm"]["name"], rhythm);
    assert!(app.state.multiplexer.style().zeus);
}

#[tokio::test]
async fn test_style_rejects_unknown_names() {
    let app = create_test_app();
    let (status, body) = app
        .put("/style", json!({ "archetype": "NINGUÉM" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (_, archetypes) = app.get("/archetypes").await;
    let (status, _) = app
        .put("/style", json!({ "rhythm": "Valsa", "archetype": archetypes[0]["name"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_accepts_and_settles() {
    let app = create_test_app();
    let (status, body) = app
        .post("/sessions/rap/generate", json!({ "topic": "  Poesia de Concreto " }))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["category"], "RAP");
    assert_eq!(body["topic"], "Poesia de Concreto");
    assert_eq!(body["variants"], json!(["ALFA", "BETA"]));

    let epoch = body["epoch"].as_u64().unwrap();
    let snapshot = app.settled("RAP", epoch).await;
    assert_eq!(
        snapshot.buffers[0].text,
        canned_text("Poesia de Concreto", "ALFA")
    );
    assert!(snapshot.buffers[2].text.is_empty());
}

#[tokio::test]
async fn test_generate_without_topic_reruns_current() {
    let app = create_test_app();
    let (_, first) = app
        .post("/sessions/RAP/generate", json!({ "topic": "Lírica" }))
        .await;
    let (status, second) = app.post("/sessions/RAP/generate", json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(second["topic"], "Lírica");
    assert!(second["epoch"].as_u64() > first["epoch"].as_u64());
}

#[tokio::test]
async fn test_generate_errors() {
    let app = create_test_app();

    let (status, body) = app.post("/sessions/NADA/generate", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, _) = app.post("/sessions/RITMOS/generate", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/sessions/RAP/generate", json!({ "topic": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/sessions/RAP/word", json!({ "word": "!!" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, metrics) = app.get("/metrics").await;
    assert_eq!(metrics["endpoints"]["generate"]["error_count"], 4);
    assert_eq!(metrics["multiplexer"]["epochs_minted"], 0);
}

#[tokio::test]
async fn test_random_uses_category_topics() {
    let app = create_test_app();
    let (status, body) = app.post("/sessions/BOOMBAP/random", json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, categories) = app.get("/categories").await;
    let boombap = categories
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["key"] == "BOOMBAP")
        .unwrap()
        .clone();
    assert!(boombap["topics"].as_array().unwrap().contains(&body["topic"]));
}

#[tokio::test]
async fn test_session_listing_and_view() {
    let app = create_test_app();
    let (_, sessions) = app.get("/sessions").await;
    let sessions = sessions.as_array().unwrap();
    assert_eq!(sessions.len(), 14);
    assert!(sessions.iter().all(|s| s["loading"] == false && s["epoch"].is_null()));

    let (status, view) = app.get("/sessions/RAIZ_HIPHOP").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["variants"].as_array().unwrap().len(), 3);
    assert_eq!(view["variants"][0]["display"]["kind"], "structured");

    let (status, _) = app.get("/sessions/NADA").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_speech_endpoint() {
    let app = create_test_app();
    let (status, body) = app
        .post("/speech", json!({ "text": "### LETRA\nrima forte [HOOK]\n### VOZ\ngrave" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sample_rate"], 24_000);
    assert_eq!(body["duration_ms"], 100);
    assert!(body["audio_base64"].as_str().unwrap().len() > 100);
    assert_eq!(
        app.speech.requests.lock().unwrap().clone(),
        vec!["Letra: rima forte".to_string()]
    );
}

#[tokio::test]
async fn test_speech_without_lyrics_is_silent_success() {
    let app = create_test_app();
    let (status, body) = app
        .post("/speech", json!({ "text": "### LETRA\n[INTRO] (pausa)\n### VOZ\nx" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["audio_base64"].is_null());
    assert!(app.speech.requests.lock().unwrap().is_empty());

    let (status, _) = app.post("/speech", json!({ "text": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, metrics) = app.get("/metrics").await;
    assert_eq!(metrics["speech"]["silent"], 1);
}

#[tokio::test]
async fn test_variant_speech_unknown_variant() {
    let app = create_test_app();
    let (status, _) = app
        .post("/sessions/RAP/variants/GAMA/speech", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
