//! Text-to-Speech
//!
//! One request per sentence. Backends:
//! - [`HttpSpeechBackend`]: OpenAI-compatible `/audio/speech`
//! - [`StubSpeechBackend`]: silent WAV whose length follows the text

use async_trait::async_trait;
use mock_interview_config::{EndpointSettings, TimeoutSettings};
use mock_interview_core::{AudioClip, AudioFormat};
use std::io::Cursor;
use std::time::Duration;

use crate::PipelineError;

/// Speech backend trait
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Synthesize one sentence in the given voice
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioClip, PipelineError>;

    /// Backend name for logs
    fn name(&self) -> &str {
        "speech"
    }
}

/// OpenAI-compatible speech endpoint
pub struct HttpSpeechBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    format: AudioFormat,
}

impl HttpSpeechBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        format: AudioFormat,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Tts(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            format,
        })
    }

    pub fn from_settings(
        endpoints: &EndpointSettings,
        timeouts: &TimeoutSettings,
    ) -> Result<Self, PipelineError> {
        Self::new(
            endpoints.speech_base_url.clone(),
            endpoints.api_key.clone(),
            endpoints.speech_model.clone(),
            endpoints.speech_format,
            timeouts.speech(),
        )
    }

    fn url(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechBackend for HttpSpeechBackend {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<AudioClip, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice,
            "response_format": self.format.as_str(),
        });

        let mut request = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| PipelineError::Tts(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Tts(format!("TTS API error {}: {}", status, body)));
        }

        let bytes = response.bytes().await.map_err(|e| PipelineError::Tts(e.to_string()))?;
        Ok(AudioClip::new(bytes.to_vec(), self.format))
    }

    fn name(&self) -> &str {
        "http-speech"
    }
}

/// Stub backend when no speech service is configured (returns silence)
pub struct StubSpeechBackend {
    sample_rate: u32,
    per_char: Duration,
}

impl StubSpeechBackend {
    pub fn new(sample_rate: u32) -> Self {
        tracing::warn!("Using stub speech backend - audio output will be silence");
        Self {
            sample_rate,
            per_char: Duration::from_millis(50),
        }
    }

    /// Silence emitted per input character
    pub fn with_char_duration(mut self, per_char: Duration) -> Self {
        self.per_char = per_char;
        self
    }
}

impl Default for StubSpeechBackend {
    fn default() -> Self {
        Self::new(16_000)
    }
}

#[async_trait]
impl SpeechBackend for StubSpeechBackend {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<AudioClip, PipelineError> {
        let duration = self.per_char * text.chars().count() as u32;
        let data = silent_wav(duration, self.sample_rate)?;
        Ok(AudioClip::new(data, AudioFormat::Wav))
    }

    fn name(&self) -> &str {
        "stub-speech"
    }
}

/// Encode `duration` of 16-bit mono silence as a WAV file
pub fn silent_wav(duration: Duration, sample_rate: u32) -> Result<Vec<u8>, PipelineError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let samples = (duration.as_micros() * sample_rate as u128 / 1_000_000) as usize;
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for _ in 0..samples {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
