//! Turn states and candidate actions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whose turn it is
///
/// Exactly one state is active per session at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TurnState {
    /// Not started, concluded, or failed to initialize
    #[default]
    Idle,
    /// Candidate may type or start recording
    CandidateTurn,
    /// Waiting on the interviewer's reply (or a transcript)
    InterviewerProcessing,
    /// Sentence queue is being spoken
    InterviewerSpeaking,
    /// Candidate voice capture is open
    CandidateRecording,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::CandidateTurn => "candidate_turn",
            TurnState::InterviewerProcessing => "interviewer_processing",
            TurnState::InterviewerSpeaking => "interviewer_speaking",
            TurnState::CandidateRecording => "candidate_recording",
        }
    }

    /// States in which the candidate holds control
    pub fn is_candidate_held(&self) -> bool {
        matches!(self, TurnState::CandidateTurn | TurnState::CandidateRecording)
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a candidate can take through the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateAction {
    SubmitText,
    StartRecording,
    StopRecording,
    /// Cut interviewer speech short (barge-in)
    Interrupt,
}

impl CandidateAction {
    pub const ALL: [CandidateAction; 4] = [
        CandidateAction::SubmitText,
        CandidateAction::StartRecording,
        CandidateAction::StopRecording,
        CandidateAction::Interrupt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateAction::SubmitText => "submit_text",
            CandidateAction::StartRecording => "start_recording",
            CandidateAction::StopRecording => "stop_recording",
            CandidateAction::Interrupt => "interrupt",
        }
    }
}

impl fmt::Display for CandidateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
