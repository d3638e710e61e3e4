pub mod lyrics;
pub mod pcm;
mod wav;

use std::{hash::BuildHasher, num::NonZeroUsize, sync::Arc, time::Instant};

use ahash::RandomState;
use async_trait::async_trait;
use lru::LruCache;
use serde::Serialize;
use tokio::sync::RwLock as TokioRwLock;
use tokio::time::Duration;
use tracing::{debug, error, info};

pub use lyrics::{prepare_lyrics, request_text, MAX_SPEECH_CHARS};
pub use pcm::{decode_pcm_base64, AudioBuffer, SPEECH_SAMPLE_RATE};
pub use wav::encode_wav_base64;

/// Remote text-to-speech model.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Base64 16-bit PCM for `text`, or `None` when the backend answered
    /// without an audio part.
    async fn synthesize_pcm(&self, text: &str) -> anyhow::Result<Option<String>>;
}

/// Audio ready for the browser to play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechAudio {
    pub audio_base64: String,
    pub sample_rate: u32,
    pub duration_ms: u64,
}

// Cached audio response
#[derive(Clone)]
struct CachedResponse {
    audio: SpeechAudio,
    cached_at: Instant,
}

pub struct SpeechSynthesizer {
    backend: Arc<dyn SpeechBackend>,
    // Prepared lyrics text -> synthesized audio
    response_cache: Arc<TokioRwLock<LruCache<u64, CachedResponse>>>,
    response_cache_ttl: Duration,
    hasher: RandomState,
}

impl SpeechSynthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>) -> Self {
        Self::with_cache(backend, 128, Duration::from_secs(3600))
    }

    pub fn with_cache(backend: Arc<dyn SpeechBackend>, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            backend,
            response_cache: Arc::new(TokioRwLock::new(LruCache::new(capacity))),
            response_cache_ttl: ttl,
            hasher: RandomState::new(),
        }
    }

    /// Speak the lyrics section of a full variant buffer.
    ///
    /// Never fails: empty lyrics mean no request is made, and backend or
    /// decoding failures are logged and reported as `None`.
    pub async fn synthesize(&self, full_text: &str) -> Option<SpeechAudio> {
        let Some(lyrics) = prepare_lyrics(full_text) else {
            debug!("No speakable lyrics, skipping speech request");
            return None;
        };
        match self.synthesize_lyrics(&lyrics).await {
            Ok(audio) => audio,
            Err(e) => {
                error!("Speech synthesis failed: {e:#}");
                None
            }
        }
    }

    async fn synthesize_lyrics(&self, lyrics: &str) -> anyhow::Result<Option<SpeechAudio>> {
        let key = self.hasher.hash_one(lyrics);
        {
            let cache = self.response_cache.read().await;
            if let Some(cached) = cache.peek(&key) {
                if cached.cached_at.elapsed() < self.response_cache_ttl {
                    debug!("Speech cache hit");
                    return Ok(Some(cached.audio.clone()));
                }
            }
        }

        let started = Instant::now();
        let Some(payload) = self.backend.synthesize_pcm(&request_text(lyrics)).await? else {
            info!("Speech backend returned no audio");
            return Ok(None);
        };

        let buffer = decode_pcm_base64(&payload)?;
        let audio = SpeechAudio {
            audio_base64: encode_wav_base64(&buffer)?,
            sample_rate: buffer.sample_rate,
            duration_ms: buffer.duration_ms(),
        };
        info!(
            "Synthesized {} ms of speech in {:.2}s",
            audio.duration_ms,
            started.elapsed().as_secs_f64()
        );

        {
            let mut cache = self.response_cache.write().await;
            cache.put(
                key,
                CachedResponse {
                    audio: audio.clone(),
                    cached_at: Instant::now(),
                },
            );
        }

        Ok(Some(audio))
    }
}
