//! Decoding of the speech backend's raw audio payload.

use anyhow::{bail, Context};
use base64::Engine;

/// The backend answers with mono 16-bit little-endian PCM at this rate.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

const PCM_SCALE: f32 = 32768.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels.max(1) as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Base64 PCM into normalized `f32` samples (`sample / 32768`).
pub fn decode_pcm_base64(payload: &str) -> anyhow::Result<AudioBuffer> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .context("audio payload is not valid base64")?;
    if bytes.len() % 2 != 0 {
        bail!("PCM payload has an odd byte count ({})", bytes.len());
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM_SCALE)
        .collect();

    Ok(AudioBuffer {
        samples,
        sample_rate: SPEECH_SAMPLE_RATE,
        channels: 1,
    })
}
