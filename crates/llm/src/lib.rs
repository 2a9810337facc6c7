//! Interviewer reply backends
//!
//! - [`HttpReplyBackend`]: posts the conversation to a JSON endpoint
//! - [`ScriptedReplyBackend`]: replays canned replies (offline runs, tests)

mod http;
mod scripted;

pub use http::HttpReplyBackend;
pub use scripted::ScriptedReplyBackend;
