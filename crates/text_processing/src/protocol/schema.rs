//! Exhibit candidate validation
//!
//! A candidate is the text between one open/close marker pair. It is accepted
//! only if it decodes to a JSON object with a non-empty `title`, a `type` from
//! the closed kind set, and a non-null `data`.

use mock_interview_core::{Exhibit, ExhibitId, ExhibitKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Optional Markdown code fence around the JSON body
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*(.*?)\s*```\s*$").expect("valid fence regex")
});

/// Why a candidate block was dropped
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExhibitRejection {
    #[error("block is not valid JSON: {0}")]
    Json(String),

    #[error("block is not a JSON object")]
    NotObject,

    #[error("missing or empty title")]
    MissingTitle,

    #[error("missing type")]
    MissingType,

    #[error("unsupported type {0:?}")]
    UnsupportedType(String),

    #[error("missing or null data")]
    MissingData,
}

/// A candidate that passed validation but has no id yet
#[derive(Debug, Clone, PartialEq)]
pub struct ExhibitCandidate {
    pub title: String,
    pub kind: ExhibitKind,
    pub data: Value,
}

impl ExhibitCandidate {
    /// Assign the id; only accepted candidates ever reach this point
    pub fn into_exhibit(self, id: ExhibitId) -> Exhibit {
        Exhibit::new(id, self.title, self.kind, self.data)
    }
}

/// Validate the text between one marker pair
pub fn validate_candidate(block: &str) -> Result<ExhibitCandidate, ExhibitRejection> {
    let body = match CODE_FENCE.captures(block) {
        Some(captures) => captures.get(1).map_or("", |m| m.as_str()),
        None => block.trim(),
    };

    let value: Value =
        serde_json::from_str(body).map_err(|e| ExhibitRejection::Json(e.to_string()))?;
    let Value::Object(mut object) = value else {
        return Err(ExhibitRejection::NotObject);
    };

    let title = match object.get("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => title.trim().to_string(),
        _ => return Err(ExhibitRejection::MissingTitle),
    };

    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind
            .parse::<ExhibitKind>()
            .map_err(|_| ExhibitRejection::UnsupportedType(kind.clone()))?,
        Some(Value::Null) | None => return Err(ExhibitRejection::MissingType),
        Some(other) => return Err(ExhibitRejection::UnsupportedType(other.to_string())),
    };

    let data = match object.remove("data") {
        Some(Value::Null) | None => return Err(ExhibitRejection::MissingData),
        Some(data) => data,
    };

    Ok(ExhibitCandidate { title, kind, data })
}
