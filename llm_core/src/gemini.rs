//! HTTP client for the hosted Gemini models.
//!
//! Text generation uses `streamGenerateContent?alt=sse`; the response body is
//! a server-sent event stream whose `data:` lines each carry a partial
//! `GenerateContentResponse`. Speech uses the non-streaming `generateContent`
//! call with an audio response modality.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use tts_core::SpeechBackend;

use crate::client::{FragmentStream, GenerationBackend};
use crate::prompt::{GenerationRequest, ModelTier};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ZEUS_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Puck";

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub zeus_model: String,
    pub tts_model: String,
    pub voice: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("zeus_model", &self.zeus_model)
            .field("tts_model", &self.tts_model)
            .field("voice", &self.voice)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            zeus_model: DEFAULT_ZEUS_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            api_key: env("GEMINI_API_KEY").or_else(|| env("API_KEY")),
            base_url: env("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            model: env("GEMINI_MODEL").unwrap_or(defaults.model),
            zeus_model: env("GEMINI_ZEUS_MODEL").unwrap_or(defaults.zeus_model),
            tts_model: env("GEMINI_TTS_MODEL").unwrap_or(defaults.tts_model),
            voice: env("GEMINI_VOICE").unwrap_or(defaults.voice),
        }
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => &self.model,
            ModelTier::Advanced => &self.zeus_model,
        }
    }
}

pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

static SHARED_CLIENT: OnceLock<Arc<GeminiClient>> = OnceLock::new();

/// Process-wide client, built on first use. Later calls ignore `config`.
pub fn shared_client(config: &GeminiConfig) -> anyhow::Result<Arc<GeminiClient>> {
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(client.clone());
    }
    let client = Arc::new(GeminiClient::new(config.clone())?);
    Ok(SHARED_CLIENT.get_or_init(|| client).clone())
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        if config.api_key.is_none() {
            warn!("No GEMINI_API_KEY set; generation and speech requests will fail");
        }
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        info!(
            "Gemini client ready: model={}, zeus_model={}, tts_model={}",
            config.model, config.zeus_model, config.tts_model
        );
        Ok(Self { http, config })
    }

    fn api_key(&self) -> anyhow::Result<&str> {
        self.config
            .api_key
            .as_deref()
            .context("GEMINI_API_KEY is not configured")
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.config.base_url.trim_end_matches('/'), model, method)
    }

    async fn post(&self, url: String, body: serde_json::Value) -> anyhow::Result<reqwest::Response> {
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key()?)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GenerateContentResponse>(&detail)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(detail);
            anyhow::bail!("Gemini returned {status}: {message}");
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn open_stream(&self, request: GenerationRequest) -> anyhow::Result<FragmentStream> {
        let model = self.config.model_for(request.tier);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "generationConfig": { "temperature": request.temperature },
        });
        debug!(model, variant = %request.variant, "POST streamGenerateContent");

        let response = self
            .post(self.endpoint(model, "streamGenerateContent?alt=sse"), body)
            .await?;
        let mut bytes = response.bytes_stream();

        Ok(Box::pin(async_stream::stream! {
            let mut decoder = SseDecoder::default();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(anyhow::Error::new(e).context("generation stream interrupted"));
                        return;
                    }
                };
                for event in decoder.push(&chunk) {
                    match parse_event(&event) {
                        Ok(Some(text)) => {
                            yield Ok::<String, anyhow::Error>(text);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
            if let Some(event) = decoder.finish() {
                match parse_event(&event) {
                    Ok(Some(text)) => {
                        yield Ok(text);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl SpeechBackend for GeminiClient {
    async fn synthesize_pcm(&self, text: &str) -> anyhow::Result<Option<String>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": self.config.voice } }
                },
            },
        });
        debug!(model = %self.config.tts_model, chars = text.chars().count(), "POST generateContent (speech)");

        let response = self
            .post(self.endpoint(&self.config.tts_model, "generateContent"), body)
            .await?
            .json::<GenerateContentResponse>()
            .await
            .context("speech response is not valid JSON")?;

        Ok(response.inline_audio())
    }
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    fn text(&self) -> String {
        self.first_parts().iter().filter_map(|p| p.text.as_deref()).collect()
    }

    fn inline_audio(&self) -> Option<String> {
        self.first_parts()
            .first()
            .and_then(|p| p.inline_data.as_ref())
            .map(|d| d.data.clone())
    }
}

/// Text carried by one SSE payload, `None` when it has none.
fn parse_event(data: &str) -> anyhow::Result<Option<String>> {
    let response: GenerateContentResponse =
        serde_json::from_str(data).context("malformed generation event")?;
    if let Some(error) = response.error {
        anyhow::bail!("{}", error.message);
    }
    let text = response.text();
    Ok((!text.is_empty()).then_some(text))
}

/// Incremental `text/event-stream` line decoder.
///
/// Network chunks can split lines and UTF-8 sequences anywhere, so bytes are
/// held until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    /// Prefix of `pending` known to contain no newline.
    scanned: usize,
}

impl SseDecoder {
    /// Feed bytes, get back the `data:` payloads of every completed line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset + 1;
            if let Some(data) = data_payload(&self.pending[start..end]) {
                events.push(data);
            }
            start = end;
            self.scanned = end;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();
        events
    }

    /// Payload of a trailing line that never got its newline.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        let line = std::mem::take(&mut self.pending);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?.trim_start();
    (!data.is_empty()).then(|| data.to_string())
}
