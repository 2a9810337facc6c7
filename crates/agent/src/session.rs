//! Interview Session
//!
//! Drives one mock interview: fetches interviewer replies, splits them into
//! prose and exhibits, speaks prose sentence by sentence, and hands control
//! back to the candidate.
//!
//! All mutable state lives behind one lock that is never held across an
//! await. Every entry into `InterviewerProcessing` bumps a turn epoch;
//! results that arrive for an older epoch are dropped.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use mock_interview_config::InterviewConfig;
use mock_interview_core::{
    BackendError, CandidateAction, CapturedAudio, Exhibit, ExhibitId, HistoryEntry,
    InterviewContext, InterviewerReply, Message, MessageId, ReplyBackend, ReplyRequest, Role,
    TurnState,
};
use mock_interview_pipeline::{
    AudioPlayer, PlaybackObserver, SentenceQueue, SequenceOutcome, SpeechBackend,
    SpeechSequencer, TranscriptionBackend,
};
use mock_interview_text_processing::{segment_sentences, ReplyParser};

use crate::exhibits::ExhibitCorrelator;
use crate::turn::{TurnMachine, TurnTrigger};
use crate::AgentError;

/// Collaborators a session talks to
#[derive(Clone)]
pub struct SessionBackends {
    pub reply: Arc<dyn ReplyBackend>,
    pub speech: Arc<dyn SpeechBackend>,
    pub transcriber: Arc<dyn TranscriptionBackend>,
    pub player: Arc<dyn AudioPlayer>,
}

/// Session events
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started { session_id: String },
    StateChanged { old: TurnState, new: TurnState },
    MessageAdded(Message),
    ExhibitsAdded(Vec<ExhibitId>),
    /// Audio for sentence `index` of the current reply began playing
    AudioStarted { index: usize },
    SentenceSkipped { index: usize, reason: String },
    SpeechFinished { spoken: usize, skipped: usize },
    /// User-visible error
    Notice(String),
    Ended { reason: String },
}

/// What a session operation led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Reply is being spoken; the session returns to `CandidateTurn` when done
    Speaking { sentences: usize },
    /// Reply shown as one message; candidate's turn
    Shown,
    /// Reply ended the interview
    Concluded,
    /// Recoverable failure; candidate's turn again
    Failed { notice: String },
    /// Recording held no speech; nothing was sent
    NoInput,
    /// A newer turn or the end of the session overtook this one
    Superseded,
}

struct ActivePlayback {
    epoch: u64,
    cancel: CancellationToken,
    queue: Arc<Mutex<SentenceQueue>>,
}

struct SessionInner {
    machine: TurnMachine,
    messages: Vec<Message>,
    history: Vec<HistoryEntry>,
    correlator: ExhibitCorrelator,
    playback: Option<ActivePlayback>,
    epoch: u64,
    next_message_id: u64,
    speech_enabled: bool,
    initialized: bool,
    concluded: bool,
}

/// State shared with the playback task
struct Shared {
    session_id: String,
    inner: Mutex<SessionInner>,
    player: Arc<dyn AudioPlayer>,
    event_tx: broadcast::Sender<SessionEvent>,
    state_tx: watch::Sender<TurnState>,
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Fire a trigger and publish the change
    fn transition(&self, inner: &mut SessionInner, trigger: TurnTrigger) -> Result<(), AgentError> {
        let transition = inner.machine.fire(trigger)?;
        self.state_tx.send_replace(transition.to);

        if transition.from != transition.to {
            self.emit(SessionEvent::StateChanged {
                old: transition.from,
                new: transition.to,
            });
        }
        Ok(())
    }

    fn push_message(&self, inner: &mut SessionInner, message: Message) {
        self.emit(SessionEvent::MessageAdded(message.clone()));
        inner.messages.push(message);
    }

    fn new_message(inner: &mut SessionInner, role: Role, content: impl Into<String>) -> Message {
        inner.next_message_id += 1;
        Message::new(MessageId(inner.next_message_id), role, content)
    }

    /// Cancel in-flight playback, if any
    ///
    /// The player is stopped here, under the session lock, so the cancelled
    /// run never touches audio that belongs to a later turn.
    fn stop_playback(&self, inner: &mut SessionInner) {
        if let Some(playback) = inner.playback.take() {
            tracing::debug!(
                session_id = %self.session_id,
                epoch = playback.epoch,
                "Stopping playback"
            );
            playback.cancel.cancel();
            self.player.stop();
        }
    }

    /// Enter `InterviewerProcessing` for a new turn, returning its epoch
    fn begin_processing(
        &self,
        inner: &mut SessionInner,
        trigger: TurnTrigger,
    ) -> Result<u64, AgentError> {
        self.transition(inner, trigger)?;
        self.stop_playback(inner);
        inner.epoch += 1;
        Ok(inner.epoch)
    }
}

/// Reports sequencer progress into the session
struct SessionObserver {
    shared: Arc<Shared>,
    epoch: u64,
    /// Exhibits for the first revealed sentence
    exhibits: Mutex<Option<Vec<ExhibitId>>>,
}

impl SessionObserver {
    fn is_current(&self, inner: &SessionInner) -> bool {
        inner.epoch == self.epoch && inner.machine.state() == TurnState::InterviewerSpeaking
    }
}

impl PlaybackObserver for SessionObserver {
    fn sentence_revealed(&self, index: usize, text: &str) {
        let mut inner = self.shared.inner.lock();
        if !self.is_current(&inner) {
            return;
        }

        let message = Shared::new_message(&mut inner, Role::Interviewer, text);
        let message = match self.exhibits.lock().take() {
            Some(ids) => inner.correlator.attach(message, &ids),
            None => message,
        };

        tracing::debug!(session_id = %self.shared.session_id, index, "Sentence revealed");
        self.shared.push_message(&mut inner, message);
    }

    fn audio_started(&self, index: usize) {
        let inner = self.shared.inner.lock();
        if self.is_current(&inner) {
            self.shared.emit(SessionEvent::AudioStarted { index });
        }
    }

    fn sentence_skipped(&self, index: usize, reason: &str) {
        let inner = self.shared.inner.lock();
        if self.is_current(&inner) {
            self.shared.emit(SessionEvent::SentenceSkipped {
                index,
                reason: reason.to_string(),
            });
        }
    }
}

/// One mock interview
pub struct InterviewSession {
    shared: Arc<Shared>,
    context: InterviewContext,
    parser: ReplyParser,
    reply: Arc<dyn ReplyBackend>,
    transcriber: Arc<dyn TranscriptionBackend>,
    sequencer: SpeechSequencer,
    barge_in_enabled: bool,
    reply_timeout: Duration,
    transcription_timeout: Duration,
}

impl InterviewSession {
    pub fn new(
        session_id: impl Into<String>,
        config: &InterviewConfig,
        context: InterviewContext,
        backends: SessionBackends,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.session.event_capacity);
        let (state_tx, _) = watch::channel(TurnState::Idle);

        let sequencer = SpeechSequencer::new(
            backends.speech,
            backends.player,
            config.session.voice.clone(),
            config.timeouts.speech(),
        );

        let shared = Arc::new(Shared {
            session_id: session_id.into(),
            inner: Mutex::new(SessionInner {
                machine: TurnMachine::new(),
                messages: Vec::new(),
                history: Vec::new(),
                correlator: ExhibitCorrelator::new(),
                playback: None,
                epoch: 0,
                next_message_id: 0,
                speech_enabled: config.session.speech_enabled,
                initialized: false,
                concluded: false,
            }),
            player: sequencer.player().clone(),
            event_tx,
            state_tx,
        });

        Self {
            shared,
            context,
            parser: ReplyParser::from_settings(&config.protocol),
            reply: backends.reply,
            transcriber: backends.transcriber,
            sequencer,
            barge_in_enabled: config.session.barge_in_enabled,
            reply_timeout: config.timeouts.reply(),
            transcription_timeout: config.timeouts.transcription(),
        }
    }

    /// Fetch the opening reply
    ///
    /// A failure here is fatal: the session settles in `Idle` and returns
    /// [`AgentError::Initialization`]. The caller may call `start` again.
    pub async fn start(&self) -> Result<TurnOutcome, AgentError> {
        let (epoch, request) = {
            let mut inner = self.shared.inner.lock();
            if inner.concluded {
                return Err(AgentError::Concluded);
            }
            if inner.initialized || inner.machine.state() != TurnState::Idle {
                return Err(AgentError::AlreadyStarted);
            }

            let epoch = self.shared.begin_processing(&mut inner, TurnTrigger::SessionStarted)?;
            (epoch, self.reply_request(&inner))
        };

        tracing::info!(session_id = %self.shared.session_id, "Interview session started");
        self.shared.emit(SessionEvent::Started {
            session_id: self.shared.session_id.clone(),
        });

        self.request_reply(epoch, request, true).await
    }

    /// Submit a typed answer
    pub async fn submit_text(&self, text: &str) -> Result<TurnOutcome, AgentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptySubmission);
        }

        let (epoch, request) = {
            let mut inner = self.shared.inner.lock();
            self.check_action(&inner, CandidateAction::SubmitText)?;

            let message = Shared::new_message(&mut inner, Role::Candidate, text);
            self.shared.push_message(&mut inner, message);
            inner.history.push(HistoryEntry::candidate(text));

            let epoch = self.shared.begin_processing(&mut inner, TurnTrigger::TextSubmitted)?;
            (epoch, self.reply_request(&inner))
        };

        self.request_reply(epoch, request, false).await
    }

    /// Open voice capture
    pub fn start_recording(&self) -> Result<(), AgentError> {
        let mut inner = self.shared.inner.lock();
        self.check_action(&inner, CandidateAction::StartRecording)?;
        self.shared.transition(&mut inner, TurnTrigger::RecordingStarted)
    }

    /// Close voice capture and answer with the transcript
    pub async fn stop_recording(&self, audio: CapturedAudio) -> Result<TurnOutcome, AgentError> {
        let epoch = {
            let mut inner = self.shared.inner.lock();
            self.check_action(&inner, CandidateAction::StopRecording)?;

            if audio.is_empty() {
                tracing::debug!(session_id = %self.shared.session_id, "Recording held no audio");
                self.shared.transition(&mut inner, TurnTrigger::RecordingEmpty)?;
                return Ok(TurnOutcome::NoInput);
            }

            self.shared.begin_processing(&mut inner, TurnTrigger::RecordingStopped)?
        };

        let transcript = tokio::time::timeout(
            self.transcription_timeout,
            self.transcriber.transcribe(&audio),
        )
        .await
        .map_err(|_| format!("timed out after {}ms", self.transcription_timeout.as_millis()))
        .and_then(|result| result.map_err(|e| e.to_string()));

        let request = {
            let mut inner = self.shared.inner.lock();
            if !self.is_current(&inner, epoch) {
                tracing::debug!(session_id = %self.shared.session_id, epoch, "Discarding stale transcript");
                return Ok(TurnOutcome::Superseded);
            }

            let text = match transcript {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => {
                    self.shared.transition(&mut inner, TurnTrigger::TranscriptionFailed)?;
                    self.shared.emit(SessionEvent::Notice(
                        "No speech was detected. Please try again.".to_string(),
                    ));
                    return Ok(TurnOutcome::NoInput);
                }
                Err(reason) => {
                    tracing::warn!(session_id = %self.shared.session_id, %reason, "Transcription failed");
                    metrics::counter!("interview_transcriptions_failed_total").increment(1);
                    let notice = format!("Your answer could not be transcribed: {}", reason);
                    self.shared.transition(&mut inner, TurnTrigger::TranscriptionFailed)?;
                    self.shared.emit(SessionEvent::Notice(notice.clone()));
                    return Ok(TurnOutcome::Failed { notice });
                }
            };

            let message = Shared::new_message(&mut inner, Role::Candidate, text.clone());
            self.shared.push_message(&mut inner, message);
            inner.history.push(HistoryEntry::candidate(text));
            self.reply_request(&inner)
        };

        self.request_reply(epoch, request, false).await
    }

    /// Cut interviewer speech short (barge-in)
    ///
    /// Sentences already revealed stay in the log.
    pub fn interrupt(&self) -> Result<(), AgentError> {
        let mut inner = self.shared.inner.lock();
        self.check_action(&inner, CandidateAction::Interrupt)?;

        tracing::info!(session_id = %self.shared.session_id, "Candidate interrupted speech");
        self.shared.transition(&mut inner, TurnTrigger::SpeechInterrupted)?;
        self.shared.stop_playback(&mut inner);
        Ok(())
    }

    /// Toggle speech for subsequent replies
    pub fn set_speech_enabled(&self, enabled: bool) {
        let mut inner = self.shared.inner.lock();
        if inner.speech_enabled != enabled {
            tracing::debug!(session_id = %self.shared.session_id, enabled, "Speech toggled");
            inner.speech_enabled = enabled;
        }
    }

    /// End the session from any state
    pub fn end(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut inner = self.shared.inner.lock();

        self.shared.stop_playback(&mut inner);
        inner.epoch += 1;
        inner.concluded = true;
        // SessionEnded is legal from every state
        let _ = self.shared.transition(&mut inner, TurnTrigger::SessionEnded);

        tracing::info!(session_id = %self.shared.session_id, %reason, "Interview session ended");
        self.shared.emit(SessionEvent::Ended { reason });
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn state(&self) -> TurnState {
        self.shared.inner.lock().machine.state()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.inner.lock().messages.clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.inner.lock().history.clone()
    }

    pub fn exhibits(&self) -> Vec<Exhibit> {
        self.shared.inner.lock().correlator.exhibits().to_vec()
    }

    pub fn exhibit(&self, id: ExhibitId) -> Option<Exhibit> {
        self.shared.inner.lock().correlator.get(id).cloned()
    }

    /// Every exhibit introduced by a message
    pub fn exhibits_for(&self, message: MessageId) -> Vec<ExhibitId> {
        self.shared.inner.lock().correlator.exhibits_for(message).to_vec()
    }

    pub fn speech_enabled(&self) -> bool {
        self.shared.inner.lock().speech_enabled
    }

    pub fn is_concluded(&self) -> bool {
        self.shared.inner.lock().concluded
    }

    /// `(cursor, len)` of the sentence queue while speaking
    pub fn speech_progress(&self) -> Option<(usize, usize)> {
        let inner = self.shared.inner.lock();
        inner.playback.as_ref().map(|playback| {
            let queue = playback.queue.lock();
            (queue.cursor(), queue.len())
        })
    }

    /// Candidate actions legal right now
    pub fn allowed_actions(&self) -> Vec<CandidateAction> {
        let inner = self.shared.inner.lock();
        if inner.concluded {
            return Vec::new();
        }
        inner
            .machine
            .allowed_actions()
            .into_iter()
            .filter(|action| *action != CandidateAction::Interrupt || self.barge_in_enabled)
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<TurnState> {
        self.shared.state_tx.subscribe()
    }

    /// Wait until the session reaches `target`
    pub async fn wait_for_state(&self, target: TurnState) {
        let mut rx = self.watch_state();
        loop {
            if *rx.borrow_and_update() == target {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn check_action(&self, inner: &SessionInner, action: CandidateAction) -> Result<(), AgentError> {
        if inner.concluded {
            return Err(AgentError::Concluded);
        }

        let allowed = inner.machine.can_fire(action.into())
            && (action != CandidateAction::Interrupt || self.barge_in_enabled);
        if !allowed {
            return Err(AgentError::InvalidAction {
                action: action.to_string(),
                state: inner.machine.state(),
            });
        }
        Ok(())
    }

    fn is_current(&self, inner: &SessionInner, epoch: u64) -> bool {
        inner.epoch == epoch && inner.machine.state() == TurnState::InterviewerProcessing
    }

    fn reply_request(&self, inner: &SessionInner) -> ReplyRequest {
        ReplyRequest {
            session_id: self.shared.session_id.clone(),
            history: inner.history.clone(),
            context: self.context.clone(),
        }
    }

    async fn request_reply(
        &self,
        epoch: u64,
        request: ReplyRequest,
        initial: bool,
    ) -> Result<TurnOutcome, AgentError> {
        tracing::debug!(
            session_id = %self.shared.session_id,
            epoch,
            backend = self.reply.name(),
            history_len = request.history.len(),
            "Fetching interviewer reply"
        );

        let started = Instant::now();
        let result = tokio::time::timeout(self.reply_timeout, self.reply.fetch_reply(&request))
            .await
            .unwrap_or_else(|_| Err(BackendError::Timeout(self.reply_timeout.as_millis() as u64)));
        metrics::histogram!("interview_reply_latency_seconds").record(started.elapsed().as_secs_f64());

        let mut inner = self.shared.inner.lock();
        if !self.is_current(&inner, epoch) {
            tracing::debug!(session_id = %self.shared.session_id, epoch, "Discarding stale reply");
            return Ok(TurnOutcome::Superseded);
        }

        match result {
            Ok(reply) => {
                metrics::counter!("interview_replies_fetched_total").increment(1);
                if initial {
                    inner.initialized = true;
                }
                self.deliver_reply(&mut inner, epoch, reply)
            }
            Err(e) if initial => {
                metrics::counter!("interview_replies_failed_total").increment(1);
                tracing::error!(session_id = %self.shared.session_id, error = %e, "Failed to fetch opening reply");
                self.shared.transition(&mut inner, TurnTrigger::InitializationFailed)?;
                self.shared.emit(SessionEvent::Notice(format!(
                    "The interview could not be started: {}",
                    e
                )));
                Err(AgentError::Initialization(e.to_string()))
            }
            Err(e) => {
                metrics::counter!("interview_replies_failed_total").increment(1);
                tracing::warn!(session_id = %self.shared.session_id, error = %e, "Reply fetch failed");
                let notice = format!("The interviewer could not respond: {}", e);
                // The answer stays in the message log but leaves the history,
                // so resending it produces the same request.
                if inner.history.last().map_or(false, |entry| entry.role == Role::Candidate) {
                    inner.history.pop();
                }
                self.shared.transition(&mut inner, TurnTrigger::ReplyFailed)?;
                self.shared.emit(SessionEvent::Notice(notice.clone()));
                Ok(TurnOutcome::Failed { notice })
            }
        }
    }

    fn deliver_reply(
        &self,
        inner: &mut SessionInner,
        epoch: u64,
        reply: InterviewerReply,
    ) -> Result<TurnOutcome, AgentError> {
        inner.history.push(HistoryEntry::interviewer(reply.content.clone()));

        let parsed = self.parser.parse(&reply.content);
        let exhibit_ids = inner.correlator.add_exhibits(parsed.exhibits);
        if !exhibit_ids.is_empty() {
            self.shared.emit(SessionEvent::ExhibitsAdded(exhibit_ids.clone()));
        }

        if reply.concluded {
            self.show_reply(inner, parsed.prose, &exhibit_ids);
            inner.concluded = true;
            self.shared.transition(inner, TurnTrigger::ReplyConcluded)?;
            tracing::info!(session_id = %self.shared.session_id, "Interview concluded");
            self.shared.emit(SessionEvent::Ended {
                reason: "interview concluded".to_string(),
            });
            return Ok(TurnOutcome::Concluded);
        }

        if inner.speech_enabled && !parsed.prose.is_empty() {
            let sentences = segment_sentences(&parsed.prose);
            let count = sentences.len();
            self.shared.transition(inner, TurnTrigger::ReplySpoken)?;
            self.spawn_playback(inner, epoch, sentences, exhibit_ids);
            return Ok(TurnOutcome::Speaking { sentences: count });
        }

        self.show_reply(inner, parsed.prose, &exhibit_ids);
        self.shared.transition(inner, TurnTrigger::ReplyShown)?;
        Ok(TurnOutcome::Shown)
    }

    /// Append a whole reply as one message
    fn show_reply(&self, inner: &mut SessionInner, prose: String, exhibit_ids: &[ExhibitId]) {
        if prose.is_empty() && exhibit_ids.is_empty() {
            tracing::warn!(session_id = %self.shared.session_id, "Interviewer reply was empty");
            return;
        }

        let message = Shared::new_message(inner, Role::Interviewer, prose);
        let message = inner.correlator.attach(message, exhibit_ids);
        self.shared.push_message(inner, message);
    }

    fn spawn_playback(
        &self,
        inner: &mut SessionInner,
        epoch: u64,
        sentences: Vec<String>,
        exhibit_ids: Vec<ExhibitId>,
    ) {
        let queue = Arc::new(Mutex::new(SentenceQueue::new(sentences)));
        let cancel = CancellationToken::new();
        inner.playback = Some(ActivePlayback {
            epoch,
            cancel: cancel.clone(),
            queue: queue.clone(),
        });

        let observer = Arc::new(SessionObserver {
            shared: self.shared.clone(),
            epoch,
            exhibits: Mutex::new((!exhibit_ids.is_empty()).then_some(exhibit_ids)),
        });
        let shared = self.shared.clone();
        let sequencer = self.sequencer.clone();
        let span = tracing::debug_span!("playback", session_id = %shared.session_id, epoch);

        tokio::spawn(
            async move {
                let outcome = sequencer.run(queue, observer, cancel).await;
                let SequenceOutcome::Completed { spoken, skipped } = outcome else {
                    return;
                };

                let mut inner = shared.inner.lock();
                if inner.epoch != epoch || inner.machine.state() != TurnState::InterviewerSpeaking {
                    tracing::debug!("Discarding stale playback completion");
                    return;
                }

                inner.playback = None;
                shared.emit(SessionEvent::SpeechFinished { spoken, skipped });
                if let Err(e) = shared.transition(&mut inner, TurnTrigger::SpeechDrained) {
                    tracing::warn!(error = %e, "Could not hand turn back after speech");
                }
            }
            .instrument(span),
        );
    }
}

impl Drop for InterviewSession {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        self.shared.stop_playback(&mut inner);
    }
}
