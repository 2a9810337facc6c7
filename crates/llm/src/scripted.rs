//! Scripted reply backend for offline sessions and tests

use async_trait::async_trait;
use mock_interview_core::{BackendError, InterviewerReply, ReplyBackend, ReplyRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Plays back a fixed list of replies in order
///
/// Every request is recorded so callers can inspect what history was sent.
#[derive(Default)]
pub struct ScriptedReplyBackend {
    replies: Mutex<VecDeque<Result<InterviewerReply, BackendError>>>,
    requests: Mutex<Vec<ReplyRequest>>,
}

impl ScriptedReplyBackend {
    pub fn new(replies: impl IntoIterator<Item = InterviewerReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply
    pub fn push_reply(&self, reply: InterviewerReply) {
        self.replies.lock().push_back(Ok(reply));
    }

    /// Queue a failure; the next request returns it
    pub fn push_failure(&self, error: BackendError) {
        self.replies.lock().push_back(Err(error));
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ReplyBackend for ScriptedReplyBackend {
    async fn fetch_reply(&self, request: &ReplyRequest) -> Result<InterviewerReply, BackendError> {
        self.requests.lock().push(request.clone());

        match self.replies.lock().pop_front() {
            Some(next) => next,
            None => {
                tracing::warn!("Reply script exhausted");
                Err(BackendError::Unavailable("reply script exhausted".to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
