//! Audio containers exchanged with speech and transcription collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::time::Duration;

/// Encoded audio formats the engine passes around
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    #[default]
    Mp3,
    Opus,
    /// Raw 16-bit mono PCM at 16kHz
    Pcm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Pcm => "pcm",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Opus => "audio/ogg",
            AudioFormat::Pcm => "audio/pcm",
        }
    }

    /// Nominal bytes per second, used when the container has no duration header
    fn nominal_byte_rate(&self) -> u64 {
        match self {
            AudioFormat::Wav | AudioFormat::Pcm => 32_000,
            AudioFormat::Mp3 => 16_000,
            AudioFormat::Opus => 4_000,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "opus" => Ok(AudioFormat::Opus),
            "pcm" => Ok(AudioFormat::Pcm),
            other => Err(format!("unknown audio format: {}", other)),
        }
    }
}

/// Synthesized speech for one sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub format: AudioFormat,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, format: AudioFormat) -> Self {
        Self { data, format }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Exact duration read from a WAV header, if this clip is a readable WAV
    pub fn duration(&self) -> Option<Duration> {
        if self.format != AudioFormat::Wav {
            return None;
        }

        let reader = hound::WavReader::new(Cursor::new(self.data.as_slice())).ok()?;
        let sample_rate = reader.spec().sample_rate;
        if sample_rate == 0 {
            return None;
        }
        let frames = reader.duration() as u64;
        Some(Duration::from_micros(frames * 1_000_000 / sample_rate as u64))
    }

    /// Header duration when available, else estimated from the nominal bitrate
    pub fn playback_duration(&self) -> Duration {
        self.duration().unwrap_or_else(|| {
            let millis = self.data.len() as u64 * 1000 / self.format.nominal_byte_rate();
            Duration::from_millis(millis)
        })
    }
}

/// Audio captured from the candidate's microphone
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapturedAudio {
    pub data: Vec<u8>,
    pub format: AudioFormat,
}

impl CapturedAudio {
    pub fn new(data: Vec<u8>, format: AudioFormat) -> Self {
        Self { data, format }
    }

    /// Zero captured bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
