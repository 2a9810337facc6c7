//! Chat messages and conversation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::exhibit::ExhibitId;

/// Who produced an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The simulated interviewer
    Interviewer,
    /// The person being interviewed
    Candidate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Interviewer => "interviewer",
            Role::Candidate => "candidate",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message identifier
///
/// Assigned from a per-session counter, so ordering of ids is append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// One chat-visible utterance
///
/// Interviewer replies spoken aloud produce one message per sentence.
/// Messages are immutable once appended to a session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    /// Display text
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set only on the message that introduces an exhibit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exhibit_ref: Option<ExhibitId>,
}

impl Message {
    pub fn new(id: MessageId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            timestamp: Utc::now(),
            exhibit_ref: None,
        }
    }

    /// Attach an exhibit reference
    pub fn with_exhibit(mut self, exhibit: Option<ExhibitId>) -> Self {
        self.exhibit_ref = exhibit;
        self
    }

    pub fn is_from(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Role + content pair sent to the reply backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn candidate(content: impl Into<String>) -> Self {
        Self::new(Role::Candidate, content)
    }

    pub fn interviewer(content: impl Into<String>) -> Self {
        Self::new(Role::Interviewer, content)
    }
}
