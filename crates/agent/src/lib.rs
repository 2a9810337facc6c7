//! Interview turn engine
//!
//! - [`turn`]: the turn state machine
//! - [`exhibits`]: exhibit collection and message correlation
//! - [`session`]: one interview, wiring parser, segmenter, sequencer and backends
//!
//! # Example
//!
//! ```ignore
//! let session = InterviewSession::new("s-1", &config, InterviewContext::for_case("coffee"), backends);
//! session.start().await?;
//! session.wait_for_state(TurnState::CandidateTurn).await;
//! session.submit_text("I'd start by sizing the market.").await?;
//! ```

pub mod exhibits;
pub mod session;
pub mod turn;

pub use exhibits::ExhibitCorrelator;
pub use session::{InterviewSession, SessionBackends, SessionEvent, TurnOutcome};
pub use turn::{next_state, Transition, TurnError, TurnMachine, TurnTrigger};

use mock_interview_core::TurnState;
use thiserror::Error;

/// Agent errors
///
/// Recoverable turn failures are not errors; see [`TurnOutcome::Failed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("{action} is not allowed while {state}")]
    InvalidAction { action: String, state: TurnState },

    #[error("Submission is empty")]
    EmptySubmission,

    #[error("Interview has concluded")]
    Concluded,

    #[error("Session already started")]
    AlreadyStarted,

    #[error("Initialization failed: {0}")]
    Initialization(String),
}

impl From<TurnError> for AgentError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::IllegalTransition { state, trigger } => AgentError::InvalidAction {
                action: trigger.to_string(),
                state,
            },
        }
    }
}
