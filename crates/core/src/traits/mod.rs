//! Collaborator traits
//!
//! The engine reaches external services only through these contracts.
//! Speech and transcription contracts live in the pipeline crate next to the
//! sequencer that drives them.

mod reply;

pub use reply::{InterviewContext, InterviewerReply, ReplyBackend, ReplyRequest};
