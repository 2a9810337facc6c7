//! Reply-fetch contract
//!
//! One request carries the full ordered history plus case context; one
//! response carries the raw interviewer reply. Requests are safe to resend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::BackendError;
use crate::message::HistoryEntry;

/// Session and case context forwarded with every reply request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewContext {
    /// Case being practiced, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    /// Free-form attributes (interview type, difficulty, ...)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InterviewContext {
    pub fn for_case(case_id: impl Into<String>) -> Self {
        Self {
            case_id: Some(case_id.into()),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Reply request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub session_id: String,
    /// Ordered conversation so far, oldest first
    pub history: Vec<HistoryEntry>,
    pub context: InterviewContext,
}

/// Raw interviewer reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewerReply {
    /// Prose with embedded exhibit blocks
    pub content: String,
    /// The interview has concluded with this reply
    #[serde(default)]
    pub concluded: bool,
}

impl InterviewerReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            concluded: false,
        }
    }

    /// Closing reply that ends the interview
    pub fn closing(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            concluded: true,
        }
    }
}

/// Produces the next interviewer reply
#[async_trait]
pub trait ReplyBackend: Send + Sync {
    /// Fetch one reply for the given history
    async fn fetch_reply(&self, request: &ReplyRequest) -> Result<InterviewerReply, BackendError>;

    /// Backend name for logs
    fn name(&self) -> &str {
        "reply"
    }
}
