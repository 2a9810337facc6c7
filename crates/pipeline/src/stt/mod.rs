//! Speech-to-Text for candidate recordings
//!
//! A recording is transcribed in one request once capture stops. An empty
//! transcript is not an error here; the session decides what it means.

use async_trait::async_trait;
use mock_interview_config::{EndpointSettings, TimeoutSettings};
use mock_interview_core::CapturedAudio;
use serde::Deserialize;
use std::time::Duration;

use crate::PipelineError;

/// Transcription backend trait
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe a finished recording
    async fn transcribe(&self, audio: &CapturedAudio) -> Result<String, PipelineError>;

    fn name(&self) -> &str {
        "transcription"
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// OpenAI-compatible transcription endpoint
pub struct HttpTranscriptionBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpTranscriptionBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Stt(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_settings(
        endpoints: &EndpointSettings,
        timeouts: &TimeoutSettings,
    ) -> Result<Self, PipelineError> {
        Self::new(
            endpoints.transcription_base_url.clone(),
            endpoints.api_key.clone(),
            endpoints.transcription_model.clone(),
            timeouts.transcription(),
        )
    }
}

#[async_trait]
impl TranscriptionBackend for HttpTranscriptionBackend {
    async fn transcribe(&self, audio: &CapturedAudio) -> Result<String, PipelineError> {
        if audio.is_empty() {
            return Ok(String::new());
        }

        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::multipart::Part::bytes(audio.data.clone())
            .file_name(format!("audio.{}", audio.format.as_str()))
            .mime_str(audio.format.mime_type())
            .map_err(|e| PipelineError::Stt(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let mut request = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| PipelineError::Stt(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Stt(format!("STT API error {}: {}", status, body)));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Stt(e.to_string()))?;
        Ok(parsed.text.trim().to_string())
    }

    fn name(&self) -> &str {
        "http-transcription"
    }
}

/// Stub transcription backend for offline sessions and tests
pub struct StubTranscriptionBackend {
    transcript: String,
}

impl StubTranscriptionBackend {
    pub fn new(transcript: impl Into<String>) -> Self {
        tracing::warn!("Using stub transcription backend - recordings map to a fixed transcript");
        Self {
            transcript: transcript.into(),
        }
    }
}

#[async_trait]
impl TranscriptionBackend for StubTranscriptionBackend {
    async fn transcribe(&self, audio: &CapturedAudio) -> Result<String, PipelineError> {
        if audio.is_empty() {
            return Ok(String::new());
        }
        Ok(self.transcript.clone())
    }

    fn name(&self) -> &str {
        "stub-transcription"
    }
}
