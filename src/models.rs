use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::preview::PreviewId;

// Who authored a message.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// Whether a message is settled or still waiting on the backend.
// A `Pending` message is mutated exactly once (to `Final` or `Error`);
// `Final` and `Error` messages are immutable.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    Final,
    Pending,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
}

// Display metadata for an image bubble. The preview id references bytes held
// by the conversation's PreviewStore, not the composer's handle.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub preview: PreviewId,
    pub file_name: String,
    pub size_bytes: u64,
}

impl AttachmentMeta {
    /// Human-readable size for the bubble caption, e.g. "12.3 KB".
    pub fn size_display(&self) -> String {
        format!("{} KB", (self.size_bytes as f64 / 102.4).round() / 10.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageContent {
    Text(String),
    Image(AttachmentMeta),
}

// Represents a single message in the transcript
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    #[serde(default = "Uuid::new_v4")] // Generate a new UUID if missing during deserialization
    pub id: Uuid,
    pub role: Role,
    pub state: MessageState,
    pub content: MessageContent,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self.content {
            MessageContent::Text(_) => MessageKind::Text,
            MessageContent::Image(_) => MessageKind::Image,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            state: MessageState::Final,
            content: MessageContent::Text(text.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn user_image(meta: AttachmentMeta) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            state: MessageState::Final,
            content: MessageContent::Image(meta),
            timestamp: Utc::now(),
        }
    }

    // The optimistic "working" bubble appended while a request is in flight.
    pub fn pending_placeholder() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            state: MessageState::Pending,
            content: MessageContent::Text(String::new()),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant_final(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            state: MessageState::Final,
            content: MessageContent::Text(text.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant_error(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            state: MessageState::Error,
            content: MessageContent::Text(text.into()),
            timestamp: Utc::now(),
        }
    }
}

// Transcript change notifications, emitted so a rendering layer can redraw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversationEvent {
    MessageAppended(Uuid),
    MessageResolved(Uuid),
}
