//! Conversation list reducer.
//!
//! `ChatState` is the single authoritative holder of the merged conversation
//! list. Three asynchronous sources feed it: the one-time initial fetch, the
//! message feed of the currently active conversation, and open-chat requests
//! from sibling views. All mutation happens through reducer calls that run to
//! completion, so no partially merged state is ever observable. Reducer calls
//! are idempotent where the sources can re-deliver: re-applying an equal
//! resolution or feed batch converges to the same state.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, trace};

use crate::content::linkify;
use crate::events::{OpenChatRequest, RequestOrigin};
use crate::identity::{resolve_other_party, CurrentUser, NameConfidence, ResolvedParty};
use crate::models::{
    ChatMessage, ChatSnapshot, Conversation, ConversationRow, ListPhase, MessageView,
};
use crate::payload::{MessageContent, RawConversation, RawMessage};

const DEFAULT_HISTORY_LIMIT: usize = 200;

/// What an open-chat request did to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Relayed request, dropped for loop prevention.
    Ignored,
    /// An existing conversation was moved to the front and activated.
    Activated { id: String, match_id: Option<String> },
    /// A new conversation was synthesized, prepended and activated.
    Created { id: String, match_id: Option<String> },
}

pub struct ChatState {
    user: CurrentUser,
    conversations: Vec<Conversation>,
    active_id: Option<String>,
    draft: Option<String>,
    phase: ListPhase,
    history_limit: usize,
    local_seq: u64,
}

impl ChatState {
    pub fn new(user: CurrentUser) -> Self {
        Self {
            user,
            conversations: Vec::new(),
            active_id: None,
            draft: None,
            phase: ListPhase::Empty,
            history_limit: DEFAULT_HISTORY_LIMIT,
            local_seq: 0,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn phase(&self) -> ListPhase {
        self.phase
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        let id = self.active_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn set_draft(&mut self, draft: Option<String>) {
        self.draft = draft;
    }

    /// Replace the list wholesale from a fresh fetch.
    ///
    /// Records sharing a match id are deduplicated, first occurrence wins.
    /// A previously active conversation stays active when it survives the
    /// refetch; otherwise the first entry is selected.
    pub fn load_conversations(&mut self, records: &[Value]) {
        let mut seen = HashSet::new();
        let mut list = Vec::new();
        for value in records {
            let raw = RawConversation::from_value(value);
            if let Some(match_id) = &raw.match_id {
                if !seen.insert(match_id.clone()) {
                    debug!(%match_id, "dropping duplicate conversation record");
                    continue;
                }
            }
            list.push(self.conversation_from_raw(&raw));
        }

        let previous_active = self.active_id.take();
        self.conversations = list;
        self.active_id = previous_active
            .filter(|id| self.conversations.iter().any(|c| &c.id == id))
            .or_else(|| self.conversations.first().map(|c| c.id.clone()));
        self.phase = ListPhase::Loaded;
        debug!(count = self.conversations.len(), "conversation list loaded");
    }

    /// Conversations whose names still need a detail lookup, as
    /// `(conversation id, match id)` pairs.
    pub fn unresolved(&self) -> Vec<(String, String)> {
        self.conversations
            .iter()
            .filter(|c| c.name_confidence < NameConfidence::Verified)
            .filter_map(|c| Some((c.id.clone(), c.match_id.clone()?)))
            .collect()
    }

    /// Apply an open-chat request from a sibling view.
    pub fn open_chat(&mut self, request: &OpenChatRequest) -> OpenOutcome {
        if request.origin == RequestOrigin::Relayed {
            trace!("ignoring relayed open-chat request");
            return OpenOutcome::Ignored;
        }

        if let Some(match_id) = &request.match_id {
            let existing = self
                .conversations
                .iter()
                .position(|c| c.match_id.as_deref() == Some(match_id.as_str()));
            if let Some(pos) = existing {
                let conv = self.conversations.remove(pos);
                let id = conv.id.clone();
                self.conversations.insert(0, conv);
                self.active_id = Some(id.clone());
                if let Some(name) = &request.name {
                    // names supplied by the requesting view outrank heuristics
                    let resolved = ResolvedParty {
                        party_id: None,
                        name: Some(name.clone()),
                        avatar: request.avatar.clone(),
                        confidence: NameConfidence::Explicit,
                    };
                    self.apply_resolution(&id, &resolved);
                }
                if request.initial_message.is_some() {
                    self.draft = request.initial_message.clone();
                }
                self.mark_updated();
                debug!(%id, "existing conversation moved to front");
                return OpenOutcome::Activated {
                    id,
                    match_id: Some(match_id.clone()),
                };
            }
        }

        // unknown thread: synthesize it, and drop stale local-only drafts so
        // they cannot pile up
        self.conversations.retain(|c| !c.is_local());

        let id = match &request.match_id {
            Some(match_id) => match_id.clone(),
            None => {
                self.local_seq += 1;
                format!("conv-{}", self.local_seq)
            }
        };
        let name_confidence = if request.name.is_some() {
            NameConfidence::Explicit
        } else {
            NameConfidence::Placeholder
        };
        let conv = Conversation {
            name: request.name.clone().unwrap_or_else(|| format!("conv-{id}")),
            id: id.clone(),
            match_id: request.match_id.clone(),
            name_confidence,
            avatar: request.avatar.clone(),
            other_party_id: None,
            last: None,
            last_time: None,
            messages: Vec::new(),
        };
        self.conversations.insert(0, conv);
        self.active_id = Some(id.clone());
        self.draft = request.initial_message.clone();
        self.mark_updated();
        debug!(%id, "conversation synthesized from open-chat request");
        OpenOutcome::Created {
            id,
            match_id: request.match_id.clone(),
        }
    }

    /// Apply a message-feed batch for the given match.
    ///
    /// The feed is scoped to the active conversation; batches for anything
    /// else, and batches that change nothing, are skipped. Returns whether
    /// the batch was applied.
    pub fn apply_feed(&mut self, match_id: &str, records: &[Value]) -> bool {
        let user_id = self.user.id.clone();
        let history_limit = self.history_limit;
        let Some(active_id) = self.active_id.clone() else {
            return false;
        };
        let Some(conv) = self.conversations.iter_mut().find(|c| c.id == active_id) else {
            return false;
        };
        if conv.match_id.as_deref() != Some(match_id) {
            trace!(%match_id, "feed batch is not for the active conversation, skipping");
            return false;
        }

        let mut messages: Vec<ChatMessage> = records
            .iter()
            .map(|v| ChatMessage::from_raw(&RawMessage::from_value(v), &user_id))
            .collect();

        // keep optimistic sends the feed has not caught up with yet
        let pending: Vec<ChatMessage> = conv
            .messages
            .iter()
            .filter(|m| m.pending && !messages.iter().any(|n| n.id == m.id))
            .cloned()
            .collect();
        messages.extend(pending);

        if messages.len() > history_limit {
            let excess = messages.len() - history_limit;
            messages.drain(0..excess);
        }
        if messages == conv.messages {
            return false;
        }
        conv.messages = messages;
        refresh_last(conv);
        self.mark_updated();
        true
    }

    /// Apply a name/avatar resolution to one conversation.
    ///
    /// Gated on [`NameConfidence`]: a result arriving late with lower
    /// confidence than what is already established is dropped, so slow
    /// lookups can never regress a good name.
    pub fn apply_resolution(&mut self, conversation_id: &str, resolved: &ResolvedParty) -> bool {
        let Some(conv) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        else {
            debug!(%conversation_id, "resolution for unknown conversation dropped");
            return false;
        };
        let Some(name) = resolved.name.clone() else {
            return false;
        };
        if resolved.confidence < conv.name_confidence {
            debug!(
                %conversation_id,
                "low-confidence resolution ignored, keeping established name"
            );
            return false;
        }

        conv.name = name;
        conv.name_confidence = resolved.confidence;
        if let Some(avatar) = &resolved.avatar {
            conv.avatar = Some(avatar.clone());
        }
        if conv.other_party_id.is_none() {
            conv.other_party_id = resolved.party_id.clone();
        }
        self.mark_updated();
        true
    }

    /// Resolve a raw record against the current user without detail data.
    /// Exposed so embedders can re-run resolution when fresher records
    /// arrive.
    pub fn resolve_record(&self, raw: &RawConversation) -> ResolvedParty {
        resolve_other_party(raw, &self.user, None)
    }

    /// Append an optimistic outgoing message to the active conversation.
    ///
    /// Returns the client-generated message id, or `None` when nothing is
    /// active. The draft is consumed.
    pub fn append_outgoing(&mut self, text: &str, at: DateTime<Utc>) -> Option<String> {
        let user_id = self.user.id.clone();
        let active_id = self.active_id.clone()?;
        let conv = self
            .conversations
            .iter_mut()
            .find(|c| c.id == active_id)?;

        let id = format!("local-{}", at.timestamp_millis());
        conv.messages.push(ChatMessage {
            id: id.clone(),
            sender_id: Some(user_id),
            from_me: true,
            text: text.to_string(),
            sent_at: Some(at),
            pending: true,
        });
        refresh_last(conv);
        self.draft = None;
        self.mark_updated();
        Some(id)
    }

    /// Mark an optimistic message as acknowledged by the backend.
    pub fn confirm_outgoing(&mut self, message_id: &str) {
        for conv in &mut self.conversations {
            if let Some(message) = conv.messages.iter_mut().find(|m| m.id == message_id) {
                message.pending = false;
                return;
            }
        }
    }

    /// Roll back a failed optimistic send and restore its text as the draft
    /// so the user can retry.
    pub fn rollback_outgoing(&mut self, message_id: &str, text: &str) {
        for conv in &mut self.conversations {
            if conv.messages.iter().any(|m| m.id == message_id) {
                conv.messages.retain(|m| m.id != message_id);
                refresh_last(conv);
                break;
            }
        }
        self.draft = Some(text.to_string());
        debug!(%message_id, "outgoing message rolled back, draft restored");
    }

    /// Render model at a given instant (kept explicit for testability).
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> ChatSnapshot {
        let conversations = self
            .conversations
            .iter()
            .map(|c| ConversationRow {
                id: c.id.clone(),
                name: c.name.clone(),
                avatar: c.avatar.clone(),
                last: c.last.clone(),
                last_age: c.last_time.and_then(|t| relative_age(now, t)),
                is_active: Some(c.id.as_str()) == self.active_id.as_deref(),
            })
            .collect();

        let messages = self
            .active()
            .map(|c| {
                c.messages
                    .iter()
                    .map(|m| MessageView {
                        id: m.id.clone(),
                        from_me: m.from_me,
                        text: m.text.clone(),
                        segments: linkify(&m.text),
                        pending: m.pending,
                    })
                    .collect()
            })
            .unwrap_or_default();

        ChatSnapshot {
            conversations,
            active_id: self.active_id.clone(),
            messages,
            draft: self.draft.clone(),
            phase: self.phase,
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot_at(Utc::now())
    }

    fn conversation_from_raw(&mut self, raw: &RawConversation) -> Conversation {
        let resolved = resolve_other_party(raw, &self.user, None);
        let id = match &raw.match_id {
            Some(match_id) => match_id.clone(),
            None => {
                self.local_seq += 1;
                format!("conv-{}", self.local_seq)
            }
        };
        let name_confidence = if resolved.name.is_some() {
            resolved.confidence
        } else {
            NameConfidence::Placeholder
        };
        let last = raw
            .last_message
            .as_ref()
            .map(|v| MessageContent::from_value(v).display_text())
            .filter(|s| !s.is_empty());

        Conversation {
            name: resolved
                .name
                .unwrap_or_else(|| format!("conv-{id}")),
            id,
            match_id: raw.match_id.clone(),
            name_confidence,
            avatar: resolved.avatar,
            other_party_id: resolved.party_id,
            last,
            last_time: raw.last_message_at,
            messages: Vec::new(),
        }
    }

    fn mark_updated(&mut self) {
        if self.phase != ListPhase::Empty {
            self.phase = ListPhase::Updated;
        }
    }
}

fn refresh_last(conv: &mut Conversation) {
    conv.last = conv.messages.last().map(|m| m.text.clone());
    conv.last_time = conv.messages.last().and_then(|m| m.sent_at);
}

fn relative_age(now: DateTime<Utc>, then: DateTime<Utc>) -> Option<String> {
    let secs = now.signed_duration_since(then).num_seconds();
    if secs <= 0 {
        return Some("now".to_string());
    }
    Some(humantime::format_duration(Duration::from_secs(secs as u64)).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PartyRole;
    use chrono::TimeZone;

    fn state() -> ChatState {
        ChatState::new(CurrentUser::new("R1", PartyRole::Recruiter).with_name("Dana"))
    }

    #[test]
    fn placeholder_name_uses_conversation_id() {
        let mut st = state();
        st.load_conversations(&[serde_json::json!({ "match_id": "m-7" })]);
        assert_eq!(st.conversations()[0].name, "conv-m-7");
        assert_eq!(
            st.conversations()[0].name_confidence,
            NameConfidence::Placeholder
        );
    }

    #[test]
    fn relative_age_is_humanized() {
        let now = Utc.timestamp_opt(1_700_000_100, 0).single().unwrap();
        let then = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        assert_eq!(relative_age(now, then).as_deref(), Some("1m 40s"));
    }

    #[test]
    fn open_chat_before_initial_load_keeps_phase_empty() {
        let mut st = state();
        let outcome = st.open_chat(&OpenChatRequest::for_match("m-1"));
        assert!(matches!(outcome, OpenOutcome::Created { .. }));
        assert_eq!(st.phase(), ListPhase::Empty);
        assert_eq!(st.conversations().len(), 1);
    }
}
