use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// How often the active conversation's message feed is polled.
    pub poll_interval: Duration,

    /// Maximum messages kept per conversation.
    pub history_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            history_limit: 200,
        }
    }
}

/// Out-of-band notifications for embedders that want to react to merges
/// without diffing snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatNotice {
    ConversationsLoaded { count: usize },
    ListRefreshed { count: usize },
    ConversationOpened { id: String },
    NameResolved { id: String, name: String },
    FeedUpdated { match_id: String },
    FeedError { match_id: String, error: String },
    MessageSent { match_id: String },
    SendFailed { match_id: String, restored_text: String },
}
