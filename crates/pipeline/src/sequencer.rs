//! Speech playback sequencer
//!
//! Drains a [`SentenceQueue`] one sentence at a time:
//!
//! ```text
//! reveal text -> fetch audio -> play -> advance
//!                      \- error -> skip, advance
//! ```
//!
//! Only one sentence is in flight at a time. Sentence N+1 is fetched only
//! after sentence N's playback has closed, and sentence N's text is revealed
//! before its audio is requested.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::playback::AudioPlayer;
use crate::tts::SpeechBackend;
use crate::PipelineError;

/// Per-turn sentences plus the playback cursor
///
/// `cursor <= len()` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceQueue {
    sentences: Vec<String>,
    cursor: usize,
}

impl SentenceQueue {
    pub fn new(sentences: Vec<String>) -> Self {
        Self {
            sentences,
            cursor: 0,
        }
    }

    /// Replace the contents and rewind
    pub fn load(&mut self, sentences: Vec<String>) {
        self.sentences = sentences;
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&str> {
        self.sentences.get(self.cursor).map(String::as_str)
    }

    pub fn advance(&mut self) {
        if self.cursor < self.sentences.len() {
            self.cursor += 1;
        }
    }

    pub fn is_drained(&self) -> bool {
        self.cursor >= self.sentences.len()
    }

    pub fn clear(&mut self) {
        self.sentences.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Callbacks from the playback loop
///
/// Called from the sequencer task; implementations must not block.
pub trait PlaybackObserver: Send + Sync {
    /// Sentence text is ready to show; its audio has not been requested yet
    fn sentence_revealed(&self, index: usize, text: &str);

    fn audio_started(&self, _index: usize) {}

    fn sentence_finished(&self, _index: usize) {}

    fn sentence_skipped(&self, _index: usize, _reason: &str) {}
}

/// How a playback run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Queue drained
    Completed { spoken: usize, skipped: usize },
    /// Cancelled before the queue drained
    Cancelled,
}

/// Fetches and plays sentences one at a time
#[derive(Clone)]
pub struct SpeechSequencer {
    speech: Arc<dyn SpeechBackend>,
    player: Arc<dyn AudioPlayer>,
    voice: String,
    speech_timeout: Duration,
}

impl SpeechSequencer {
    pub fn new(
        speech: Arc<dyn SpeechBackend>,
        player: Arc<dyn AudioPlayer>,
        voice: impl Into<String>,
        speech_timeout: Duration,
    ) -> Self {
        Self {
            speech,
            player,
            voice: voice.into(),
            speech_timeout,
        }
    }

    pub fn player(&self) -> &Arc<dyn AudioPlayer> {
        &self.player
    }

    /// Drain the queue until it is empty or `cancel` fires
    ///
    /// The queue is cleared when the run ends either way. A cancelled run only
    /// drops its pending play future; whoever fires `cancel` must stop the
    /// player itself.
    pub async fn run(
        &self,
        queue: Arc<Mutex<SentenceQueue>>,
        observer: Arc<dyn PlaybackObserver>,
        cancel: CancellationToken,
    ) -> SequenceOutcome {
        let mut spoken = 0;
        let mut skipped = 0;

        loop {
            if cancel.is_cancelled() {
                return self.cancelled(&queue);
            }

            let (index, sentence) = {
                let queue = queue.lock();
                match queue.current() {
                    Some(sentence) => (queue.cursor(), sentence.to_string()),
                    None => break,
                }
            };

            observer.sentence_revealed(index, &sentence);

            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.step(index, &sentence, observer.as_ref()) => Some(result),
            };

            match step {
                None => return self.cancelled(&queue),
                Some(Ok(())) => {
                    spoken += 1;
                    metrics::counter!("interview_sentences_spoken_total").increment(1);
                    observer.sentence_finished(index);
                }
                Some(Err(e)) => {
                    skipped += 1;
                    tracing::warn!(index, error = %e, "Skipping sentence");
                    metrics::counter!("interview_sentences_skipped_total").increment(1);
                    observer.sentence_skipped(index, &e.to_string());
                }
            }

            queue.lock().advance();
        }

        queue.lock().clear();
        tracing::debug!(spoken, skipped, "Sentence queue drained");
        SequenceOutcome::Completed { spoken, skipped }
    }

    async fn step(
        &self,
        index: usize,
        sentence: &str,
        observer: &dyn PlaybackObserver,
    ) -> Result<(), PipelineError> {
        tracing::debug!(index, backend = self.speech.name(), "Requesting speech");

        let clip = tokio::time::timeout(
            self.speech_timeout,
            self.speech.synthesize(sentence, &self.voice),
        )
        .await
        .map_err(|_| PipelineError::Timeout(self.speech_timeout.as_millis() as u64))??;

        observer.audio_started(index);
        self.player.play(&clip).await
    }

    fn cancelled(&self, queue: &Mutex<SentenceQueue>) -> SequenceOutcome {
        let mut queue = queue.lock();
        tracing::debug!(cursor = queue.cursor(), len = queue.len(), "Playback cancelled");
        queue.clear();
        SequenceOutcome::Cancelled
    }
}
