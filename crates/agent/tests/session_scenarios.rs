//! Integration tests for the interview turn flow
//!
//! Sessions are driven end to end with scripted replies and in-test speech,
//! transcription and playback backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};
use tokio::time::timeout;

use mock_interview_agent::{AgentError, InterviewSession, SessionBackends, SessionEvent, TurnOutcome};
use mock_interview_config::InterviewConfig;
use mock_interview_core::{
    AudioClip, AudioFormat, BackendError, CandidateAction, CapturedAudio, ExhibitId,
    InterviewContext, InterviewerReply, ReplyBackend, ReplyRequest, Role, TurnState,
};
use mock_interview_llm::ScriptedReplyBackend;
use mock_interview_pipeline::{
    AudioPlayer, NullAudioPlayer, PipelineError, SpeechBackend, StubSpeechBackend,
    StubTranscriptionBackend, TranscriptionBackend,
};

const WAIT: Duration = Duration::from_secs(5);

/// Fails any sentence containing "FAIL"
struct FlakySpeech;

#[async_trait]
impl SpeechBackend for FlakySpeech {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<AudioClip, PipelineError> {
        if text.contains("FAIL") {
            return Err(PipelineError::Tts("voice unavailable".into()));
        }
        Ok(AudioClip::new(vec![0u8; 32], AudioFormat::Mp3))
    }
}

/// Never finishes a clip; reports starts and counts stops
#[derive(Default)]
struct HeldPlayer {
    started: Notify,
    stops: AtomicUsize,
}

#[async_trait]
impl AudioPlayer for HeldPlayer {
    async fn play(&self, _clip: &AudioClip) -> Result<(), PipelineError> {
        self.started.notify_one();
        std::future::pending().await
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Plays each clip for its real duration; counts plays, stops and clips cut short
#[derive(Default)]
struct PacedPlayer {
    started: Notify,
    stopped: Notify,
    plays: AtomicUsize,
    stops: AtomicUsize,
    cut_short: AtomicUsize,
}

#[async_trait]
impl AudioPlayer for PacedPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), PipelineError> {
        let stopped = self.stopped.notified();
        self.plays.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();

        tokio::select! {
            _ = tokio::time::sleep(clip.playback_duration()) => Ok(()),
            _ = stopped => {
                self.cut_short.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::Playback("stopped".into()))
            }
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.stopped.notify_waiters();
    }
}

/// Reply backend that never answers
struct SilentReply;

#[async_trait]
impl ReplyBackend for SilentReply {
    async fn fetch_reply(&self, _request: &ReplyRequest) -> Result<InterviewerReply, BackendError> {
        std::future::pending().await
    }
}

struct FailingTranscriber;

#[async_trait]
impl TranscriptionBackend for FailingTranscriber {
    async fn transcribe(&self, _audio: &CapturedAudio) -> Result<String, PipelineError> {
        Err(PipelineError::Stt("service down".into()))
    }
}

struct Harness {
    reply: Arc<dyn ReplyBackend>,
    speech: Arc<dyn SpeechBackend>,
    transcriber: Arc<dyn TranscriptionBackend>,
    player: Arc<dyn AudioPlayer>,
    config: InterviewConfig,
}

impl Harness {
    fn new(reply: Arc<dyn ReplyBackend>) -> Self {
        Self {
            reply,
            speech: Arc::new(StubSpeechBackend::default()),
            transcriber: Arc::new(StubTranscriptionBackend::new("I would look at costs first.")),
            player: Arc::new(NullAudioPlayer),
            config: InterviewConfig::default(),
        }
    }

    fn scripted(replies: Vec<InterviewerReply>) -> (Self, Arc<ScriptedReplyBackend>) {
        let backend = Arc::new(ScriptedReplyBackend::new(replies));
        (Self::new(backend.clone()), backend)
    }

    fn speech(mut self, speech: Arc<dyn SpeechBackend>) -> Self {
        self.speech = speech;
        self
    }

    fn player(mut self, player: Arc<dyn AudioPlayer>) -> Self {
        self.player = player;
        self
    }

    fn transcriber(mut self, transcriber: Arc<dyn TranscriptionBackend>) -> Self {
        self.transcriber = transcriber;
        self
    }

    fn configure(mut self, f: impl FnOnce(&mut InterviewConfig)) -> Self {
        f(&mut self.config);
        self
    }

    fn build(self) -> InterviewSession {
        InterviewSession::new(
            "test-session",
            &self.config,
            InterviewContext::for_case("coffee-chain"),
            SessionBackends {
                reply: self.reply,
                speech: self.speech,
                transcriber: self.transcriber,
                player: self.player,
            },
        )
    }
}

async fn wait_for(session: &InterviewSession, state: TurnState) {
    timeout(WAIT, session.wait_for_state(state))
        .await
        .unwrap_or_else(|_| panic!("session never reached {}", state));
}

/// Receive events until one matches `done`, returning everything received
async fn events_until(
    rx: &mut broadcast::Receiver<SessionEvent>,
    done: impl Fn(&SessionEvent) -> bool,
) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        let event = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        let finished = done(&event);
        events.push(event);
        if finished {
            return events;
        }
    }
}

fn contents(session: &InterviewSession) -> Vec<String> {
    session.messages().into_iter().map(|m| m.content).collect()
}

const TABLE: &str = r#"<EXHIBIT>{"title":"Cost Breakdown","type":"table","data":{"columns":["Item","Cost"],"rows":[["Labor",40],["Rent",25]]}}</EXHIBIT>"#;

#[tokio::test]
async fn scenario_a_spoken_reply_one_message_per_sentence() {
    let (harness, _) = Harness::scripted(vec![InterviewerReply::new("Hello. How are you?")]);
    let session = harness.build();
    let mut rx = session.subscribe();

    assert_eq!(session.start().await.unwrap(), TurnOutcome::Speaking { sentences: 2 });
    wait_for(&session, TurnState::CandidateTurn).await;

    assert_eq!(contents(&session), vec!["Hello.", "How are you?"]);
    assert!(session.messages().iter().all(|m| m.is_from(Role::Interviewer)));

    let events = events_until(&mut rx, |e| matches!(e, SessionEvent::SpeechFinished { .. })).await;
    assert_eq!(
        events[0],
        SessionEvent::StateChanged {
            old: TurnState::Idle,
            new: TurnState::InterviewerProcessing,
        }
    );
    assert!(matches!(events[1], SessionEvent::Started { .. }));

    // each sentence's message is published before its audio starts
    let position = |target: &SessionEvent| events.iter().position(|e| e == target).unwrap();
    let audio_0 = position(&SessionEvent::AudioStarted { index: 0 });
    let audio_1 = position(&SessionEvent::AudioStarted { index: 1 });
    let message_positions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, SessionEvent::MessageAdded(_)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(message_positions.len(), 2);
    assert!(message_positions[0] < audio_0);
    assert!(audio_0 < message_positions[1]);
    assert!(message_positions[1] < audio_1);

    assert_eq!(
        events.last(),
        Some(&SessionEvent::SpeechFinished { spoken: 2, skipped: 0 })
    );
}

#[tokio::test]
async fn scenario_b_exhibit_ref_on_first_sentence() {
    let raw = format!("{} Here is the cost breakdown. What stands out?", TABLE);
    let (harness, _) = Harness::scripted(vec![InterviewerReply::new(raw)]);
    let session = harness.build();

    session.start().await.unwrap();
    wait_for(&session, TurnState::CandidateTurn).await;

    let exhibits = session.exhibits();
    assert_eq!(exhibits.len(), 1);
    assert_eq!(exhibits[0].title, "Cost Breakdown");

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].exhibit_ref, Some(exhibits[0].id));
    assert_eq!(messages[1].exhibit_ref, None);
    assert_eq!(session.exhibits_for(messages[0].id), vec![exhibits[0].id]);
    assert_eq!(session.exhibit(exhibits[0].id).map(|e| e.title), Some("Cost Breakdown".to_string()));
}

#[tokio::test]
async fn scenario_b_speech_off_single_message_carries_ref() {
    let raw = format!(
        "{} {} Compare these.",
        TABLE,
        r#"<EXHIBIT>{"title":"Share","type":"pie","data":[{"label":"A","value":60},{"label":"B","value":40}]}</EXHIBIT>"#
    );
    let (harness, _) = Harness::scripted(vec![InterviewerReply::new(raw)]);
    let session = harness.configure(|c| c.session.speech_enabled = false).build();

    assert_eq!(session.start().await.unwrap(), TurnOutcome::Shown);
    assert_eq!(session.state(), TurnState::CandidateTurn);

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Compare these.");
    assert_eq!(messages[0].exhibit_ref, Some(ExhibitId(1)));
    assert_eq!(session.exhibits_for(messages[0].id), vec![ExhibitId(1), ExhibitId(2)]);
    assert_eq!(session.exhibit(ExhibitId(2)).and_then(|e| e.series()).map(|s| s.len()), Some(2));
}

#[tokio::test]
async fn scenario_c_malformed_block_dropped_prose_delivered() {
    let raw = r#"<EXHIBIT>{"title":"Broken","data":[1,2,3]}</EXHIBIT> Walk me through your approach."#;
    let (harness, _) = Harness::scripted(vec![InterviewerReply::new(raw)]);
    let session = harness.build();

    session.start().await.unwrap();
    wait_for(&session, TurnState::CandidateTurn).await;

    assert!(session.exhibits().is_empty());
    assert_eq!(contents(&session), vec!["Walk me through your approach."]);
    assert_eq!(session.messages()[0].exhibit_ref, None);
}

#[tokio::test]
async fn scenario_d_reply_failure_returns_turn() {
    let (harness, backend) = Harness::scripted(vec![InterviewerReply::new("Welcome.")]);
    backend.push_failure(BackendError::Network("connection reset".into()));
    let session = harness.configure(|c| c.session.speech_enabled = false).build();
    let mut rx = session.subscribe();

    session.start().await.unwrap();
    let outcome = session.submit_text("Let me structure this.").await.unwrap();

    let TurnOutcome::Failed { notice } = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert!(notice.contains("connection reset"));
    assert_eq!(session.state(), TurnState::CandidateTurn);
    assert_eq!(contents(&session), vec!["Welcome.", "Let me structure this."]);

    let events = events_until(&mut rx, |e| matches!(e, SessionEvent::Notice(_))).await;
    assert!(matches!(events.last(), Some(SessionEvent::Notice(n)) if *n == notice));

    // neither the failed reply nor the unanswered submission stays in history
    assert_eq!(session.history().len(), 1);

    // a retry sends the same request the failed attempt did
    backend.push_reply(InterviewerReply::new("Go on."));
    session.submit_text("Let me structure this.").await.unwrap();
    let sent = backend.requests();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[1].history, sent[2].history);
    assert_eq!(sent[2].history.len(), 2);
    assert_eq!(
        sent[2].history.iter().filter(|entry| entry.role == Role::Candidate).count(),
        1
    );
}

#[tokio::test]
async fn scenario_e_empty_recording_returns_turn() {
    let (harness, backend) = Harness::scripted(vec![InterviewerReply::new("Welcome.")]);
    let session = harness.configure(|c| c.session.speech_enabled = false).build();

    session.start().await.unwrap();
    session.start_recording().unwrap();
    assert_eq!(session.state(), TurnState::CandidateRecording);
    assert_eq!(session.allowed_actions(), vec![CandidateAction::StopRecording]);

    let outcome = session.stop_recording(CapturedAudio::default()).await.unwrap();

    assert_eq!(outcome, TurnOutcome::NoInput);
    assert_eq!(session.state(), TurnState::CandidateTurn);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn recorded_answer_is_transcribed_and_sent() {
    let (harness, backend) = Harness::scripted(vec![
        InterviewerReply::new("Welcome."),
        InterviewerReply::new("Good thinking."),
    ]);
    let session = harness.configure(|c| c.session.speech_enabled = false).build();

    session.start().await.unwrap();
    session.start_recording().unwrap();
    let audio = CapturedAudio::new(vec![1u8; 640], AudioFormat::Wav);
    assert_eq!(session.stop_recording(audio).await.unwrap(), TurnOutcome::Shown);

    let messages = session.messages();
    assert_eq!(messages[1].role, Role::Candidate);
    assert_eq!(messages[1].content, "I would look at costs first.");
    assert_eq!(messages[2].content, "Good thinking.");
    assert_eq!(
        backend.requests()[1].history.last().map(|h| h.content.as_str()),
        Some("I would look at costs first.")
    );
}

#[tokio::test]
async fn transcription_failure_returns_turn_without_message() {
    let (harness, backend) = Harness::scripted(vec![InterviewerReply::new("Welcome.")]);
    let session = harness
        .transcriber(Arc::new(FailingTranscriber))
        .configure(|c| c.session.speech_enabled = false)
        .build();

    session.start().await.unwrap();
    session.start_recording().unwrap();
    let outcome = session
        .stop_recording(CapturedAudio::new(vec![1u8; 64], AudioFormat::Wav))
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Failed { .. }));
    assert_eq!(session.state(), TurnState::CandidateTurn);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn initialization_failure_settles_idle_and_can_retry() {
    let (harness, backend) = Harness::scripted(vec![]);
    backend.push_failure(BackendError::Status { status: 502, body: "bad gateway".into() });
    backend.push_reply(InterviewerReply::new("Welcome."));
    let session = harness.configure(|c| c.session.speech_enabled = false).build();

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, AgentError::Initialization(_)));
    assert_eq!(session.state(), TurnState::Idle);
    assert!(session.messages().is_empty());

    assert_eq!(session.start().await.unwrap(), TurnOutcome::Shown);
    assert_eq!(session.state(), TurnState::CandidateTurn);
}

#[tokio::test]
async fn illegal_actions_rejected_without_change() {
    let (harness, backend) = Harness::scripted(vec![InterviewerReply::new("One. Two.")]);
    let player = Arc::new(HeldPlayer::default());
    let session = harness.player(player.clone()).build();

    assert!(matches!(
        session.submit_text("too early").await,
        Err(AgentError::InvalidAction { state: TurnState::Idle, .. })
    ));

    session.start().await.unwrap();
    player.started.notified().await;
    assert_eq!(session.state(), TurnState::InterviewerSpeaking);

    assert!(matches!(
        session.submit_text("talking over").await,
        Err(AgentError::InvalidAction { state: TurnState::InterviewerSpeaking, .. })
    ));
    assert!(session.start_recording().is_err());
    assert_eq!(session.state(), TurnState::InterviewerSpeaking);
    assert_eq!(contents(&session), vec!["One."]);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn barge_in_cancels_playback_and_keeps_revealed_text() {
    let (harness, backend) = Harness::scripted(vec![
        InterviewerReply::new("First point. Second point. Third point."),
        InterviewerReply::new("Noted."),
    ]);
    let player = Arc::new(HeldPlayer::default());
    let session = harness.player(player.clone()).build();

    session.start().await.unwrap();
    player.started.notified().await;
    assert_eq!(session.speech_progress(), Some((0, 3)));

    session.interrupt().unwrap();
    assert_eq!(session.state(), TurnState::CandidateTurn);
    assert_eq!(session.speech_progress(), None);
    assert_eq!(player.stops.load(Ordering::SeqCst), 1);

    // the cancelled playback task winds down without stopping the player again
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(player.stops.load(Ordering::SeqCst), 1);
    assert_eq!(contents(&session), vec!["First point."]);

    session.set_speech_enabled(false);
    assert_eq!(session.submit_text("Sorry to cut in.").await.unwrap(), TurnOutcome::Shown);
    assert_eq!(contents(&session), vec!["First point.", "Sorry to cut in.", "Noted."]);
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn answer_right_after_barge_in_is_spoken_in_full() {
    let (harness, _) = Harness::scripted(vec![
        InterviewerReply::new("Let us begin with the overall market size. Then we move on."),
        InterviewerReply::new("Noted. Go on."),
    ]);
    let player = Arc::new(PacedPlayer::default());
    let session = harness
        .speech(Arc::new(StubSpeechBackend::default().with_char_duration(Duration::from_millis(20))))
        .player(player.clone())
        .build();
    let mut rx = session.subscribe();

    session.start().await.unwrap();
    player.started.notified().await;

    session.interrupt().unwrap();
    // stopped before interrupt returns, not when the old playback task wakes
    assert_eq!(player.stops.load(Ordering::SeqCst), 1);

    assert_eq!(
        session.submit_text("Sorry, go ahead.").await.unwrap(),
        TurnOutcome::Speaking { sentences: 2 }
    );
    let events = events_until(&mut rx, |e| matches!(e, SessionEvent::SpeechFinished { .. })).await;
    assert_eq!(events.last(), Some(&SessionEvent::SpeechFinished { spoken: 2, skipped: 0 }));
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::SentenceSkipped { .. })));
    wait_for(&session, TurnState::CandidateTurn).await;

    assert_eq!(player.stops.load(Ordering::SeqCst), 1);
    assert_eq!(player.plays.load(Ordering::SeqCst), 3);
    assert_eq!(player.cut_short.load(Ordering::SeqCst), 1);
    assert_eq!(
        contents(&session),
        vec![
            "Let us begin with the overall market size.",
            "Sorry, go ahead.",
            "Noted.",
            "Go on.",
        ]
    );
}

#[tokio::test]
async fn interrupt_refused_when_barge_in_disabled() {
    let (harness, _) = Harness::scripted(vec![InterviewerReply::new("Listen. Carefully.")]);
    let player = Arc::new(HeldPlayer::default());
    let session = harness
        .player(player.clone())
        .configure(|c| c.session.barge_in_enabled = false)
        .build();

    session.start().await.unwrap();
    player.started.notified().await;

    assert!(session.allowed_actions().is_empty());
    assert!(matches!(session.interrupt(), Err(AgentError::InvalidAction { .. })));
    assert_eq!(session.state(), TurnState::InterviewerSpeaking);
}

#[tokio::test]
async fn ending_mid_speech_stops_playback() {
    let (harness, _) = Harness::scripted(vec![InterviewerReply::new("One. Two. Three.")]);
    let player = Arc::new(HeldPlayer::default());
    let session = harness.player(player.clone()).build();
    let mut rx = session.subscribe();

    session.start().await.unwrap();
    player.started.notified().await;
    session.end("candidate left");

    assert_eq!(session.state(), TurnState::Idle);
    let events = events_until(&mut rx, |e| matches!(e, SessionEvent::Ended { .. })).await;
    assert!(events.contains(&SessionEvent::StateChanged {
        old: TurnState::InterviewerSpeaking,
        new: TurnState::Idle,
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(player.stops.load(Ordering::SeqCst), 1);
    assert_eq!(contents(&session), vec!["One."]);
    assert!(matches!(session.start().await, Err(AgentError::Concluded)));
}

#[tokio::test]
async fn failed_sentences_are_skipped_not_fatal() {
    let (harness, _) = Harness::scripted(vec![InterviewerReply::new(
        "Good. FAIL this one. Last point.",
    )]);
    let session = harness.speech(Arc::new(FlakySpeech)).build();
    let mut rx = session.subscribe();

    session.start().await.unwrap();
    wait_for(&session, TurnState::CandidateTurn).await;

    assert_eq!(contents(&session), vec!["Good.", "FAIL this one.", "Last point."]);
    let events = events_until(&mut rx, |e| matches!(e, SessionEvent::SpeechFinished { .. })).await;
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::SentenceSkipped { index: 1, .. })));
    assert!(!events.contains(&SessionEvent::AudioStarted { index: 1 }));
    assert_eq!(
        events.last(),
        Some(&SessionEvent::SpeechFinished { spoken: 2, skipped: 1 })
    );
}

#[tokio::test]
async fn reply_timeout_behaves_like_failure() {
    let silent = Harness::new(Arc::new(SilentReply))
        .configure(|c| c.timeouts.reply_ms = 50)
        .build();
    let err = silent.start().await.unwrap_err();
    assert!(matches!(err, AgentError::Initialization(msg) if msg.contains("Timed out")));
    assert_eq!(silent.state(), TurnState::Idle);
}

#[tokio::test]
async fn concluding_reply_ends_interview() {
    let (harness, _) = Harness::scripted(vec![
        InterviewerReply::new("Welcome."),
        InterviewerReply::closing("That's all. Thank you for your time."),
    ]);
    let session = harness.build();
    let mut rx = session.subscribe();

    session.start().await.unwrap();
    wait_for(&session, TurnState::CandidateTurn).await;

    assert_eq!(session.submit_text("My final answer.").await.unwrap(), TurnOutcome::Concluded);
    assert_eq!(session.state(), TurnState::Idle);
    assert!(session.is_concluded());
    assert_eq!(
        contents(&session).last().map(String::as_str),
        Some("That's all. Thank you for your time.")
    );

    let events = events_until(&mut rx, |e| matches!(e, SessionEvent::Ended { .. })).await;
    assert!(matches!(events.last(), Some(SessionEvent::Ended { .. })));
    assert!(matches!(session.submit_text("One more thing").await, Err(AgentError::Concluded)));
}

#[tokio::test]
async fn message_ids_follow_append_order() {
    let (harness, _) = Harness::scripted(vec![
        InterviewerReply::new("Welcome. Ready?"),
        InterviewerReply::new("Great. Begin."),
    ]);
    let session = harness.build();

    session.start().await.unwrap();
    wait_for(&session, TurnState::CandidateTurn).await;
    session.submit_text("Ready.").await.unwrap();
    wait_for(&session, TurnState::CandidateTurn).await;

    let ids: Vec<u64> = session.messages().iter().map(|m| m.id.0).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}
