use std::io::Cursor;

use base64::Engine;

use crate::pcm::AudioBuffer;

/// Re-encode decoded speech as 16-bit PCM WAV and return Base64, ready for
/// an `<audio>` element or `AudioContext.decodeAudioData` in the browser.
pub fn encode_wav_base64(audio: &AudioBuffer) -> anyhow::Result<String> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    // WAV header (44 bytes) + 2 bytes per sample
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + audio.samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| anyhow::anyhow!("wav write err: {e}"))?;

        for &s in &audio.samples {
            // Inverse of the decoder's `/ 32768` so PCM survives unchanged.
            let v = (s * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?;
        }
        writer
            .finalize()
            .map_err(|e| anyhow::anyhow!("wav finalize err: {e}"))?;
    }

    Ok(base64::engine::general_purpose::STANDARD.encode(cursor.into_inner()))
}
