//! Turn state machine
//!
//! | From                    | Trigger                                   | To                      |
//! |-------------------------|-------------------------------------------|-------------------------|
//! | `Idle`                  | `SessionStarted`                          | `InterviewerProcessing` |
//! | `InterviewerProcessing` | `ReplySpoken`                             | `InterviewerSpeaking`   |
//! | `InterviewerProcessing` | `ReplyShown`, `ReplyFailed`               | `CandidateTurn`         |
//! | `InterviewerProcessing` | `TranscriptionFailed`                     | `CandidateTurn`         |
//! | `InterviewerProcessing` | `ReplyConcluded`, `InitializationFailed`  | `Idle`                  |
//! | `InterviewerSpeaking`   | `SpeechDrained`, `SpeechInterrupted`      | `CandidateTurn`         |
//! | `CandidateTurn`         | `TextSubmitted`                           | `InterviewerProcessing` |
//! | `CandidateTurn`         | `RecordingStarted`                        | `CandidateRecording`    |
//! | `CandidateRecording`    | `RecordingStopped`                        | `InterviewerProcessing` |
//! | `CandidateRecording`    | `RecordingEmpty`                          | `CandidateTurn`         |
//! | any                     | `SessionEnded`                            | `Idle`                  |

use mock_interview_core::{CandidateAction, TurnState};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Events that move the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnTrigger {
    SessionStarted,
    /// Reply received with prose to speak
    ReplySpoken,
    /// Reply received and shown as one message
    ReplyShown,
    /// Reply marks the end of the interview
    ReplyConcluded,
    ReplyFailed,
    /// The opening reply could not be fetched
    InitializationFailed,
    SpeechDrained,
    /// Candidate barged in during speech
    SpeechInterrupted,
    TextSubmitted,
    RecordingStarted,
    RecordingStopped,
    /// Capture produced no audio
    RecordingEmpty,
    /// Transcription failed or was empty
    TranscriptionFailed,
    SessionEnded,
}

impl TurnTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnTrigger::SessionStarted => "session_started",
            TurnTrigger::ReplySpoken => "reply_spoken",
            TurnTrigger::ReplyShown => "reply_shown",
            TurnTrigger::ReplyConcluded => "reply_concluded",
            TurnTrigger::ReplyFailed => "reply_failed",
            TurnTrigger::InitializationFailed => "initialization_failed",
            TurnTrigger::SpeechDrained => "speech_drained",
            TurnTrigger::SpeechInterrupted => "speech_interrupted",
            TurnTrigger::TextSubmitted => "text_submitted",
            TurnTrigger::RecordingStarted => "recording_started",
            TurnTrigger::RecordingStopped => "recording_stopped",
            TurnTrigger::RecordingEmpty => "recording_empty",
            TurnTrigger::TranscriptionFailed => "transcription_failed",
            TurnTrigger::SessionEnded => "session_ended",
        }
    }
}

impl fmt::Display for TurnTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CandidateAction> for TurnTrigger {
    fn from(action: CandidateAction) -> Self {
        match action {
            CandidateAction::SubmitText => TurnTrigger::TextSubmitted,
            CandidateAction::StartRecording => TurnTrigger::RecordingStarted,
            CandidateAction::StopRecording => TurnTrigger::RecordingStopped,
            CandidateAction::Interrupt => TurnTrigger::SpeechInterrupted,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("{trigger} is not allowed in state {state}")]
    IllegalTransition {
        state: TurnState,
        trigger: TurnTrigger,
    },
}

/// A transition that was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: TurnState,
    pub to: TurnState,
    pub trigger: TurnTrigger,
}

/// Target state for `trigger` fired in `state`, if legal
pub fn next_state(state: TurnState, trigger: TurnTrigger) -> Option<TurnState> {
    use TurnState::*;
    use TurnTrigger::*;

    match (state, trigger) {
        (_, SessionEnded) => Some(Idle),
        (Idle, SessionStarted) => Some(InterviewerProcessing),
        (InterviewerProcessing, ReplySpoken) => Some(InterviewerSpeaking),
        (InterviewerProcessing, ReplyShown | ReplyFailed | TranscriptionFailed) => {
            Some(CandidateTurn)
        }
        (InterviewerProcessing, ReplyConcluded | InitializationFailed) => Some(Idle),
        (InterviewerSpeaking, SpeechDrained | SpeechInterrupted) => Some(CandidateTurn),
        (CandidateTurn, TextSubmitted) => Some(InterviewerProcessing),
        (CandidateTurn, RecordingStarted) => Some(CandidateRecording),
        (CandidateRecording, RecordingStopped) => Some(InterviewerProcessing),
        (CandidateRecording, RecordingEmpty) => Some(CandidateTurn),
        _ => None,
    }
}

/// Owns the current turn state and validates every change against the table
#[derive(Debug, Clone, Default)]
pub struct TurnMachine {
    state: TurnState,
}

impl TurnMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn can_fire(&self, trigger: TurnTrigger) -> bool {
        next_state(self.state, trigger).is_some()
    }

    /// Apply a trigger; illegal triggers leave the state unchanged
    pub fn fire(&mut self, trigger: TurnTrigger) -> Result<Transition, TurnError> {
        let to = next_state(self.state, trigger).ok_or(TurnError::IllegalTransition {
            state: self.state,
            trigger,
        })?;

        let transition = Transition {
            from: self.state,
            to,
            trigger,
        };
        self.state = to;

        tracing::debug!(
            from = %transition.from,
            to = %transition.to,
            trigger = %trigger,
            "Turn transition"
        );

        Ok(transition)
    }

    /// Candidate actions legal in the current state
    pub fn allowed_actions(&self) -> Vec<CandidateAction> {
        CandidateAction::ALL
            .into_iter()
            .filter(|action| self.can_fire((*action).into()))
            .collect()
    }
}
