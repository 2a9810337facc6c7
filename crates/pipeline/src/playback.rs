//! Audio players
//!
//! `play` resolves when the clip has finished. A cancelled sequencer run
//! drops its play future; the owner that cancelled it calls `stop` right
//! away, so a player must tolerate `stop` with nothing playing.

use async_trait::async_trait;
use mock_interview_core::AudioClip;
use tokio::sync::{mpsc, Notify};

use crate::PipelineError;

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play one clip to completion
    async fn play(&self, clip: &AudioClip) -> Result<(), PipelineError>;

    /// Stop whatever is playing now
    fn stop(&self);
}

/// Completes every clip immediately
#[derive(Debug, Default)]
pub struct NullAudioPlayer;

#[async_trait]
impl AudioPlayer for NullAudioPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), PipelineError> {
        if clip.is_empty() {
            return Err(PipelineError::Playback("empty clip".to_string()));
        }
        Ok(())
    }

    fn stop(&self) {}
}

/// Commands forwarded to an audio transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play(AudioClip),
    Stop,
}

/// Paces playback by clip duration
///
/// Each clip is forwarded to the optional transport channel, then `play`
/// waits for the clip's duration or until `stop` is called.
#[derive(Debug, Default)]
pub struct ClockedAudioPlayer {
    transport: Option<mpsc::UnboundedSender<PlaybackCommand>>,
    stopped: Notify,
}

impl ClockedAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(transport: mpsc::UnboundedSender<PlaybackCommand>) -> Self {
        Self {
            transport: Some(transport),
            stopped: Notify::new(),
        }
    }
}

#[async_trait]
impl AudioPlayer for ClockedAudioPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), PipelineError> {
        if clip.is_empty() {
            return Err(PipelineError::Playback("empty clip".to_string()));
        }

        if let Some(transport) = &self.transport {
            transport
                .send(PlaybackCommand::Play(clip.clone()))
                .map_err(|_| PipelineError::Playback("audio transport closed".to_string()))?;
        }

        let duration = clip.playback_duration();
        tracing::trace!(?duration, format = %clip.format, "Playing clip");

        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.stopped.notified() => Err(PipelineError::Playback("playback stopped".to_string())),
        }
    }

    fn stop(&self) {
        self.stopped.notify_waiters();
        if let Some(transport) = &self.transport {
            let _ = transport.send(PlaybackCommand::Stop);
        }
    }
}
