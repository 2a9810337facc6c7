//! Reply protocol parser
//!
//! Interviewer replies are free text with zero or more exhibit blocks:
//!
//! ```text
//! Let's look at the numbers. <EXHIBIT>{"title":"Revenue","type":"bar","data":[...]}</EXHIBIT> What do you see?
//! ```
//!
//! Markers are scanned left to right and paired by position (not nested).
//! Text outside marker pairs is prose. A bad block is dropped on its own and
//! never aborts the rest of the reply. A trailing open marker with no close
//! marker drops everything after it; a stray close marker is removed.

mod schema;

pub use schema::{validate_candidate, ExhibitCandidate, ExhibitRejection};

use mock_interview_config::ProtocolSettings;
use mock_interview_core::{Exhibit, ExhibitId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out exhibit ids, unique for the lifetime of the allocator
#[derive(Debug)]
pub struct ExhibitIdAllocator {
    next: AtomicU64,
}

impl ExhibitIdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> ExhibitId {
        ExhibitId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ExhibitIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One reply split into prose and exhibits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReply {
    /// Marker-stripped remainder, trimmed
    pub prose: String,
    /// Accepted exhibits in reply order
    pub exhibits: Vec<Exhibit>,
    /// Number of candidate blocks dropped by validation
    pub rejected: usize,
}

impl ParsedReply {
    pub fn first_exhibit(&self) -> Option<ExhibitId> {
        self.exhibits.first().map(|e| e.id)
    }

    pub fn is_empty(&self) -> bool {
        self.prose.is_empty() && self.exhibits.is_empty()
    }
}

/// Parser for one session's replies
///
/// Holds the session's exhibit id allocator so ids stay unique across replies.
#[derive(Debug)]
pub struct ReplyParser {
    open_marker: String,
    close_marker: String,
    ids: ExhibitIdAllocator,
}

impl ReplyParser {
    pub fn new(open_marker: impl Into<String>, close_marker: impl Into<String>) -> Self {
        Self {
            open_marker: open_marker.into(),
            close_marker: close_marker.into(),
            ids: ExhibitIdAllocator::new(),
        }
    }

    pub fn from_settings(settings: &ProtocolSettings) -> Self {
        Self::new(settings.open_marker.clone(), settings.close_marker.clone())
    }

    /// Split a raw reply into prose and validated exhibits
    pub fn parse(&self, raw: &str) -> ParsedReply {
        let mut parsed = ParsedReply::default();
        if raw.trim().is_empty() {
            return parsed;
        }

        let mut fragments: Vec<&str> = Vec::new();
        let mut rest = raw;

        loop {
            let Some(open_at) = rest.find(&self.open_marker) else {
                fragments.extend(rest.split(self.close_marker.as_str()));
                break;
            };

            fragments.extend(rest[..open_at].split(self.close_marker.as_str()));
            let after_open = &rest[open_at + self.open_marker.len()..];

            let Some(close_at) = after_open.find(&self.close_marker) else {
                tracing::debug!(
                    dropped_bytes = after_open.len(),
                    "Unmatched exhibit open marker, ignoring trailing block"
                );
                break;
            };

            let block = &after_open[..close_at];
            match validate_candidate(block) {
                Ok(candidate) => {
                    let exhibit = candidate.into_exhibit(self.ids.next_id());
                    tracing::debug!(
                        exhibit_id = %exhibit.id,
                        kind = %exhibit.kind,
                        title = %exhibit.title,
                        "Accepted exhibit"
                    );
                    metrics::counter!("interview_exhibits_accepted_total").increment(1);
                    parsed.exhibits.push(exhibit);
                }
                Err(reason) => {
                    tracing::warn!(%reason, "Dropping malformed exhibit block");
                    metrics::counter!("interview_exhibits_rejected_total").increment(1);
                    parsed.rejected += 1;
                }
            }

            rest = &after_open[close_at + self.close_marker.len()..];
        }

        parsed.prose = join_fragments(&fragments);
        parsed
    }
}

impl Default for ReplyParser {
    fn default() -> Self {
        Self::from_settings(&ProtocolSettings::default())
    }
}

/// Join prose fragments left around removed blocks
///
/// Each fragment is trimmed; the seam becomes a newline if either side had a
/// newline in its trimmed whitespace, otherwise a single space.
fn join_fragments(fragments: &[&str]) -> String {
    let mut prose = String::new();
    let mut pending_newline = false;

    for fragment in fragments {
        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            pending_newline |= fragment.contains('\n');
            continue;
        }

        if !prose.is_empty() {
            let leading = &fragment[..fragment.len() - fragment.trim_start().len()];
            if pending_newline || leading.contains('\n') {
                prose.push('\n');
            } else {
                prose.push(' ');
            }
        }
        prose.push_str(trimmed);

        let trailing = &fragment[fragment.trim_end().len()..];
        pending_newline = trailing.contains('\n');
    }

    prose
}
