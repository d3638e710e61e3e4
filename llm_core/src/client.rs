use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use lyrics_core::{Archetype, Variant};
use tracing::{debug, warn};

use crate::prompt::{build_request, error_fragment, GenerationRequest};

/// Raw fragments from a backend; an `Err` ends the stream.
pub type FragmentStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// A hosted language model that can stream a completion.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn open_stream(&self, request: GenerationRequest) -> anyhow::Result<FragmentStream>;
}

/// Fail-soft front of a [`GenerationBackend`].
///
/// Streams produced here never error: a failure while opening or reading
/// turns into one error-marker fragment, after which the stream ends.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Lazily opens one stream; nothing is sent until the result is polled.
    /// Not restartable: retrying means calling `stream` again.
    pub fn stream(
        &self,
        topic: &str,
        category: &str,
        variant: Variant,
        rhythm: Option<&str>,
        archetype: &Archetype,
    ) -> BoxStream<'static, String> {
        let request = build_request(topic, variant, rhythm, archetype);
        let backend = self.backend.clone();
        let category = category.to_string();

        Box::pin(async_stream::stream! {
            debug!(%category, %variant, tier = ?request.tier, "Opening generation stream");
            let mut fragments = match backend.open_stream(request).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    warn!(%category, %variant, "Generation request failed: {e:#}");
                    yield error_fragment(&e);
                    return;
                }
            };

            while let Some(item) = fragments.next().await {
                match item {
                    Ok(text) if text.is_empty() => continue,
                    Ok(text) => {
                        yield text;
                    }
                    Err(e) => {
                        warn!(%category, %variant, "Generation stream failed: {e:#}");
                        yield error_fragment(&e);
                        return;
                    }
                }
            }
            debug!(%category, %variant, "Generation stream closed");
        })
    }
}
