//! Conversation and message models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::TextSegment;
use crate::identity::NameConfidence;
use crate::payload::RawMessage;

/// One conversation thread between the current user and another party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Client-local stable key: the match id when one exists, otherwise a
    /// synthesized `conv-<n>` string.
    pub id: String,
    /// Canonical server-side identifier; absent for local-only threads that
    /// have not been persisted yet.
    pub match_id: Option<String>,
    pub name: String,
    pub name_confidence: NameConfidence,
    pub avatar: Option<String>,
    pub other_party_id: Option<String>,
    /// Cached preview of the most recent message.
    pub last: Option<String>,
    pub last_time: Option<DateTime<Utc>>,
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Local-only threads exist purely on this client (no match id yet).
    pub fn is_local(&self) -> bool {
        self.match_id.is_none()
    }
}

/// One message inside a conversation, already normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: Option<String>,
    pub from_me: bool,
    pub text: String,
    pub sent_at: Option<DateTime<Utc>>,
    /// Optimistic local send not yet acknowledged by the backend.
    pub pending: bool,
}

impl ChatMessage {
    /// Normalize a fetched record against the current user's id.
    pub fn from_raw(raw: &RawMessage, user_id: &str) -> Self {
        Self {
            id: raw
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            from_me: raw.sender_id.as_deref() == Some(user_id),
            sender_id: raw.sender_id.clone(),
            text: raw.content.display_text(),
            sent_at: raw.sent_at,
            pending: false,
        }
    }
}

/// Lifecycle of the merged conversation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListPhase {
    Empty,
    Loaded,
    Updated,
}

/// Read-only render model produced by the reducer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSnapshot {
    pub conversations: Vec<ConversationRow>,
    pub active_id: Option<String>,
    /// Messages of the active conversation, oldest first.
    pub messages: Vec<MessageView>,
    /// Unsent input text (pre-filled by open-chat requests, restored after a
    /// failed send).
    pub draft: Option<String>,
    pub phase: ListPhase,
}

/// Sidebar row for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationRow {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub last: Option<String>,
    /// Age of the last message ("14m 10s"), when known.
    pub last_age: Option<String>,
    pub is_active: bool,
}

/// Message row for the active thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    pub id: String,
    pub from_me: bool,
    pub text: String,
    pub segments: Vec<TextSegment>,
    pub pending: bool,
}
