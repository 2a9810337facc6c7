//! Core types and traits for the interview turn engine
//!
//! This crate holds the data model shared by every other crate:
//! - Chat messages and conversation history
//! - Exhibits (tables, charts, images) embedded in interviewer replies
//! - Turn states and candidate actions
//! - Audio clip containers
//! - The reply-fetch collaborator contract

pub mod audio;
pub mod error;
pub mod exhibit;
pub mod message;
pub mod traits;
pub mod turn;

pub use audio::{AudioClip, AudioFormat, CapturedAudio};
pub use error::BackendError;
pub use exhibit::{DataPoint, Exhibit, ExhibitId, ExhibitKind};
pub use message::{HistoryEntry, Message, MessageId, Role};
pub use traits::{InterviewContext, InterviewerReply, ReplyBackend, ReplyRequest};
pub use turn::{CandidateAction, TurnState};
