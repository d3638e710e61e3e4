//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use llm_core::{
    FragmentStream, GenerationBackend, GenerationClient, GenerationRequest, Multiplexer,
    SessionSnapshot, SupersedePolicy,
};
use server::config::ServerConfig;
use server::metrics::AppMetrics;
use server::{build_router, AppState};
use tower::ServiceExt;
use tts_core::{SpeechBackend, SpeechSynthesizer};

/// 100 ms of silence at 24 kHz, as base64 16-bit PCM.
pub fn silent_pcm() -> String {
    "A".repeat(6400)
}

/// Answers every prompt with a well-formed three-section response.
#[derive(Default)]
pub struct CannedGeneration {
    pub requests: Mutex<Vec<GenerationRequest>>,
}

pub fn canned_text(topic: &str, variant: &str) -> String {
    format!("### BEAT\n[boom bap {variant}]\n\n### LETRA\n[INTRO]\nrima sobre {topic}\n\n### VOZ\n[flow grave]")
}

#[async_trait]
impl GenerationBackend for CannedGeneration {
    async fn open_stream(&self, request: GenerationRequest) -> anyhow::Result<FragmentStream> {
        let text = canned_text(&request.topic, request.variant.as_str());
        self.requests.lock().unwrap().push(request);
        let (head, tail) = text.split_at(text.find("### LETRA").unwrap_or(0));
        let fragments = vec![Ok(head.to_string()), Ok(tail.to_string())];
        Ok(Box::pin(futures_util::stream::iter(fragments)))
    }
}

#[derive(Default)]
pub struct FakeSpeech {
    pub requests: Mutex<Vec<String>>,
}

#[async_trait]
impl SpeechBackend for FakeSpeech {
    async fn synthesize_pcm(&self, text: &str) -> anyhow::Result<Option<String>> {
        self.requests.lock().unwrap().push(text.to_string());
        Ok(Some(silent_pcm()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub generation: Arc<CannedGeneration>,
    pub speech: Arc<FakeSpeech>,
}

/// Create a test app instance around in-memory backends
pub fn create_test_app() -> TestApp {
    let generation = Arc::new(CannedGeneration::default());
    let speech = Arc::new(FakeSpeech::default());

    let state = AppState {
        multiplexer: Multiplexer::new(
            GenerationClient::new(generation.clone()),
            SupersedePolicy::Close,
        ),
        speech: Arc::new(SpeechSynthesizer::new(speech.clone())),
        metrics: AppMetrics::new(),
        config: ServerConfig {
            generate_on_startup: false,
            ..ServerConfig::default()
        },
    };

    TestApp {
        router: build_router(state.clone()),
        state,
        generation,
        speech,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send_json("POST", uri, body).await
    }

    pub async fn put(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send_json("PUT", uri, body).await
    }

    async fn send_json(
        &self,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&body).into_owned()));
        (status, json)
    }

    /// Waits until the session has settled epoch `epoch`.
    pub async fn settled(&self, category: &str, epoch: u64) -> SessionSnapshot {
        let mut updates = self.state.multiplexer.subscribe(category).unwrap();
        let wait = updates.wait_for(|s| !s.loading && s.epoch.map(|e| e.0) == Some(epoch));
        let snapshot = tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("session did not settle")
            .unwrap()
            .clone();
        snapshot
    }
}
