use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use llm_core::{Epoch, GenerationTicket, SessionSnapshot, StyleSettings};
use lyrics_core::{catalog, Archetype, Rhythm, Variant};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tts_core::SpeechAudio;

use crate::error::ApiError;
use crate::metrics::MetricsResponse;
use crate::validation::{
    parse_variant, resolve_archetype, resolve_rhythm, validate_speech_text, validate_topic,
    validate_word,
};
use crate::view::SessionView;
use crate::AppState;

#[derive(Serialize)]
pub struct CategoryInfo {
    key: &'static str,
    label: &'static str,
    topics: &'static [&'static str],
    generatable: bool,
}

#[derive(Deserialize)]
pub struct RhythmQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
pub struct StyleRequest {
    rhythm: Option<String>,
    archetype: String,
    #[serde(default)]
    zeus: bool,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    topic: Option<String>,
}

#[derive(Deserialize)]
pub struct WordRequest {
    word: String,
}

#[derive(Deserialize)]
pub struct SpeechRequest {
    text: String,
}

#[derive(Serialize)]
pub struct GenerationAccepted {
    category: &'static str,
    topic: String,
    epoch: Epoch,
    variants: Vec<Variant>,
}

#[derive(Serialize, Default)]
pub struct SpeechResponse {
    audio_base64: Option<String>,
    sample_rate: Option<u32>,
    duration_ms: Option<u64>,
}

impl From<Option<SpeechAudio>> for SpeechResponse {
    fn from(audio: Option<SpeechAudio>) -> Self {
        match audio {
            Some(audio) => Self {
                audio_base64: Some(audio.audio_base64),
                sample_rate: Some(audio.sample_rate),
                duration_ms: Some(audio.duration_ms),
            },
            None => Self::default(),
        }
    }
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_categories() -> Json<Vec<CategoryInfo>> {
    Json(
        catalog::categories()
            .iter()
            .map(|c| CategoryInfo {
                key: c.key,
                label: c.label,
                topics: c.topics,
                generatable: c.is_generatable(),
            })
            .collect(),
    )
}

pub async fn list_rhythms(Query(query): Query<RhythmQuery>) -> Json<Vec<Rhythm>> {
    Json(catalog::filter_rhythms(query.q.as_deref().unwrap_or_default()))
}

pub async fn list_archetypes() -> Json<Vec<Archetype>> {
    Json(catalog::archetypes())
}

pub async fn get_style(State(state): State<AppState>) -> Json<StyleSettings> {
    Json(state.multiplexer.style())
}

pub async fn put_style(
    State(state): State<AppState>,
    Json(req): Json<StyleRequest>,
) -> Result<Json<StyleSettings>, ApiError> {
    let style = StyleSettings {
        rhythm: resolve_rhythm(req.rhythm.as_deref())?,
        archetype: resolve_archetype(&req.archetype)?,
        zeus: req.zeus,
    };
    info!(
        "Style updated: rhythm={:?}, archetype={}, zeus={}",
        style.rhythm.as_ref().map(|r| &r.name),
        style.archetype.name,
        style.zeus
    );
    state.multiplexer.set_style(style.clone());
    Ok(Json(style))
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSnapshot>> {
    Json(state.multiplexer.snapshots())
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let snapshot = state.multiplexer.snapshot(&category)?;
    Ok(Json(SessionView::from_snapshot(&snapshot)))
}

/// 202 for a launched run. The ticket is dropped; the run continues.
fn accepted(
    state: &AppState,
    started: Instant,
    launched: Result<GenerationTicket, ApiError>,
) -> Result<(StatusCode, Json<GenerationAccepted>), ApiError> {
    let ticket = launched.inspect_err(|_| state.metrics.generate.record_error())?;
    state
        .metrics
        .generate
        .record_request(started.elapsed().as_millis() as u64);
    Ok((
        StatusCode::ACCEPTED,
        Json(GenerationAccepted {
            category: ticket.category,
            topic: ticket.topic,
            epoch: ticket.epoch,
            variants: ticket.variants,
        }),
    ))
}

/// Manual trigger; without a topic the session's current one is re-run.
pub async fn generate(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerationAccepted>), ApiError> {
    let started = Instant::now();
    let launched = match req.topic.as_deref() {
        Some(topic) => validate_topic(topic)
            .and_then(|topic| Ok(state.multiplexer.run_generation(&category, &topic)?)),
        None => state.multiplexer.rerun(&category).map_err(ApiError::from),
    };
    accepted(&state, started, launched)
}

pub async fn generate_random(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<(StatusCode, Json<GenerationAccepted>), ApiError> {
    let started = Instant::now();
    let launched = state.multiplexer.run_random(&category).map_err(ApiError::from);
    accepted(&state, started, launched)
}

/// A click on a rendered word starts a run with that word as topic.
pub async fn generate_from_word(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(req): Json<WordRequest>,
) -> Result<(StatusCode, Json<GenerationAccepted>), ApiError> {
    let started = Instant::now();
    let launched = validate_word(&req.word)
        .and_then(|topic| Ok(state.multiplexer.run_generation(&category, &topic)?));
    accepted(&state, started, launched)
}

async fn speak(state: &AppState, text: &str) -> SpeechResponse {
    let started = Instant::now();
    let audio = state.speech.synthesize(text).await;
    state
        .metrics
        .speech
        .record_request(started.elapsed().as_millis() as u64);
    state
        .metrics
        .speech_outcomes
        .record(audio.as_ref().map(|a| a.duration_ms));
    audio.into()
}

pub async fn variant_speech(
    State(state): State<AppState>,
    Path((category, variant)): Path<(String, String)>,
) -> Result<Json<SpeechResponse>, ApiError> {
    let variant = parse_variant(&variant)?;
    let snapshot = state.multiplexer.snapshot(&category)?;
    let text = &snapshot.buffer(variant).text;
    Ok(Json(speak(&state, text).await))
}

pub async fn speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<Json<SpeechResponse>, ApiError> {
    if let Err(e) = validate_speech_text(&req.text) {
        state.metrics.speech.record_error();
        return Err(e);
    }
    Ok(Json(speak(&state, &req.text).await))
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(state.metrics.report(state.multiplexer.stats()))
}

pub async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let updates = state.multiplexer.subscribe(&category)?;
    Ok(ws.on_upgrade(move |socket| push_session(socket, updates, category)))
}

/// Sends the current view, then one view per published snapshot.
async fn push_session(
    mut socket: WebSocket,
    mut updates: watch::Receiver<SessionSnapshot>,
    category: String,
) {
    debug!(%category, "Session socket opened");
    let mut view = SessionView::from_snapshot(&updates.borrow_and_update());
    loop {
        let payload = match serde_json::to_string(&view) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%category, "Failed to serialize session view: {e}");
                break;
            }
        };
        if let Err(e) = socket.send(Message::Text(payload.into())).await {
            debug!(%category, "Failed to send WS message: {e}");
            break;
        }

        let changed = loop {
            tokio::select! {
                changed = updates.changed() => break changed.is_ok(),
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break false,
                    // client messages are ignored; actions go through HTTP
                    Some(Ok(_)) => {}
                },
            }
        };
        if !changed {
            break;
        }
        view = SessionView::from_snapshot(&updates.borrow_and_update());
    }
    let _ = socket.send(Message::Close(None)).await;
    debug!(%category, "Session socket closed");
}
