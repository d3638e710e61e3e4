//! Lyric generation: prompt contract, hosted model client and the
//! per-category stream multiplexer.

pub mod client;
pub mod gemini;
pub mod multiplex;
pub mod prompt;

pub use client::{FragmentStream, GenerationBackend, GenerationClient};
pub use gemini::{shared_client, GeminiClient, GeminiConfig, SseDecoder};
pub use multiplex::{
    Epoch, GenerationTicket, MultiplexError, MultiplexStatsSnapshot, Multiplexer, SessionSnapshot,
    StyleSettings, SupersedePolicy, VariantBuffer,
};
pub use prompt::{build_request, GenerationRequest, ModelTier};
