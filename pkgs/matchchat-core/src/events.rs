//! Cross-view request payloads.

use serde::{Deserialize, Serialize};

/// Where an open-chat request came from.
///
/// Requests a coordinating parent view re-dispatches on behalf of another
/// component are tagged [`RequestOrigin::Relayed`] and ignored by the
/// reducer, so a request can never bounce between views indefinitely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOrigin {
    #[default]
    Direct,
    Relayed,
}

/// Request to open (and if necessary create) a conversation, dispatched by
/// sibling views such as the match dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenChatRequest {
    pub match_id: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    /// Pre-filled input text ("Hi, about the backend role…").
    pub initial_message: Option<String>,
    pub origin: RequestOrigin,
}

impl OpenChatRequest {
    pub fn for_match(match_id: impl Into<String>) -> Self {
        Self {
            match_id: Some(match_id.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_initial_message(mut self, text: impl Into<String>) -> Self {
        self.initial_message = Some(text.into());
        self
    }

    pub fn relayed(mut self) -> Self {
        self.origin = RequestOrigin::Relayed;
        self
    }
}
