//! Speech pipeline for interviewer replies
//!
//! - [`tts`]: speech backends (OpenAI-compatible HTTP, silent stub)
//! - [`stt`]: transcription backends for candidate recordings
//! - [`playback`]: audio players the sequencer plays clips through
//! - [`sequencer`]: sentence queue and the one-at-a-time playback loop

pub mod playback;
pub mod sequencer;
pub mod stt;
pub mod tts;

pub use playback::{AudioPlayer, ClockedAudioPlayer, NullAudioPlayer, PlaybackCommand};
pub use sequencer::{PlaybackObserver, SentenceQueue, SequenceOutcome, SpeechSequencer};
pub use stt::{HttpTranscriptionBackend, StubTranscriptionBackend, TranscriptionBackend};
pub use tts::{HttpSpeechBackend, SpeechBackend, StubSpeechBackend};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Speech synthesis error: {0}")]
    Tts(String),

    #[error("Transcription error: {0}")]
    Stt(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl From<hound::Error> for PipelineError {
    fn from(err: hound::Error) -> Self {
        PipelineError::Audio(err.to_string())
    }
}
