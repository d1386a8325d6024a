// src/api/ws/stt.rs
// Speech-to-text collaborator interface invoked on `end_audio` (§6).
// Raw PCM is wrapped into a WAV container before being submitted so
// sample rate and channel count travel in-band.

use async_trait::async_trait;

use crate::error::{CraceError, Result};

const PCM_SAMPLE_RATE: u32 = 16_000;
const PCM_CHANNELS: u16 = 1;
const PCM_BITS_PER_SAMPLE: u16 = 16;

#[async_trait]
pub trait SttProvider: Send + Sync {
    async fn transcribe(&self, audio: &[u8], mimetype: &str) -> Result<String>;
}

/// No STT backend configured: always reports `BackendUnavailable`, which
/// the orchestrator turns into a canned apologetic response rather than
/// failing the connection (§7 degraded-path behavior).
pub struct UnavailableSttProvider;

#[async_trait]
impl SttProvider for UnavailableSttProvider {
    async fn transcribe(&self, _audio: &[u8], _mimetype: &str) -> Result<String> {
        Err(CraceError::BackendUnavailable("no speech-to-text provider configured".to_string()))
    }
}

/// Wraps raw little-endian PCM16 mono samples in a minimal WAV container
/// so a downstream STT call can recover sample rate and channel count.
pub fn wrap_pcm_as_wav(pcm: &[u8]) -> Vec<u8> {
    let data_len = pcm.len() as u32;
    let byte_rate = PCM_SAMPLE_RATE * PCM_CHANNELS as u32 * (PCM_BITS_PER_SAMPLE as u32 / 8);
    let block_align = PCM_CHANNELS * (PCM_BITS_PER_SAMPLE / 8);
    let riff_len = 36 + data_len;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&riff_len.to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&PCM_CHANNELS.to_le_bytes());
    wav.extend_from_slice(&PCM_SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&PCM_BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_wrapper_carries_correct_header_lengths() {
        let pcm = vec![0u8; 100];
        let wav = wrap_pcm_as_wav(&pcm);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + pcm.len());
        let data_len = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_len as usize, pcm.len());
    }

    #[tokio::test]
    async fn unavailable_provider_reports_backend_unavailable() {
        let provider = UnavailableSttProvider;
        let err = provider.transcribe(&[], "audio/pcm").await.unwrap_err();
        assert!(matches!(err, CraceError::BackendUnavailable(_)));
    }
}
