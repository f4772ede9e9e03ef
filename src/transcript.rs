use chrono::Utc;
use uuid::Uuid;

use crate::error::TranscriptError;
use crate::models::{Message, MessageContent, MessageState};

// The ordered message log: append-only, never reordered, never deleted.
// Placeholders are resolved in place by id, position preserved. This is the
// single source of truth a rendering layer draws from.
#[derive(Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns its id.
    pub fn append(&mut self, message: Message) -> Uuid {
        debug_assert!(
            message.state != MessageState::Pending || !self.has_pending(),
            "second pending message appended while one is in flight"
        );
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Resolves the pending message with the given id in place, leaving its
    /// position, role and id untouched. Fails with `NotFound` when the id is
    /// unknown or the target is no longer pending — the latter is exactly
    /// the guard against a late response racing an already-fired timeout.
    pub fn resolve(
        &mut self,
        id: Uuid,
        state: MessageState,
        content: MessageContent,
    ) -> Result<(), TranscriptError> {
        debug_assert!(state != MessageState::Pending, "cannot resolve to pending");

        let target = self
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.state == MessageState::Pending)
            .ok_or(TranscriptError::NotFound { id })?;

        target.state = state;
        target.content = content;
        target.timestamp = Utc::now();
        Ok(())
    }

    /// Read-only ordered view, safe to re-render at any time.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Cloned copy of the log for consumers outside the lock.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.state == MessageState::Pending)
    }
}
