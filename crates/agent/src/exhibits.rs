//! Exhibit correlation
//!
//! Every parsed exhibit joins the session collection. The message that
//! introduces a turn (the full reply, or the first spoken sentence) carries
//! `exhibit_ref` for the first exhibit only; all of the turn's exhibits are
//! also recorded against that message.

use mock_interview_core::{Exhibit, ExhibitId, Message, MessageId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ExhibitCorrelator {
    exhibits: Vec<Exhibit>,
    by_message: HashMap<MessageId, Vec<ExhibitId>>,
}

impl ExhibitCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn's exhibits to the collection, returning their ids in order
    pub fn add_exhibits(&mut self, exhibits: Vec<Exhibit>) -> Vec<ExhibitId> {
        let ids: Vec<ExhibitId> = exhibits.iter().map(|e| e.id).collect();
        self.exhibits.extend(exhibits);
        ids
    }

    /// Attach a turn's exhibits to the message introducing them
    ///
    /// Call before the message is published; messages are immutable afterwards.
    pub fn attach(&mut self, mut message: Message, turn_exhibits: &[ExhibitId]) -> Message {
        if let Some(first) = turn_exhibits.first() {
            message.exhibit_ref = Some(*first);
            self.by_message.insert(message.id, turn_exhibits.to_vec());
        }
        message
    }

    pub fn exhibits(&self) -> &[Exhibit] {
        &self.exhibits
    }

    pub fn get(&self, id: ExhibitId) -> Option<&Exhibit> {
        self.exhibits.iter().find(|e| e.id == id)
    }

    /// All exhibits introduced by a message, in reply order
    pub fn exhibits_for(&self, message: MessageId) -> &[ExhibitId] {
        self.by_message.get(&message).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.exhibits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exhibits.is_empty()
    }
}
