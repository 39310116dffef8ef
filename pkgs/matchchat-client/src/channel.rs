//! Typed open-chat channel.
//!
//! Sibling views (the match dashboard, a profile page) ask the chat view to
//! open a conversation through this directional channel. The sending half
//! lives with the requesting view, the receiving half is drained by
//! [`crate::ChatClient::spawn_request_pump`]. One direction, one consumer:
//! a request cannot echo back to its origin.

use matchchat_core::OpenChatRequest;
use tokio::sync::mpsc;

pub type OpenChatReceiver = mpsc::UnboundedReceiver<OpenChatRequest>;

/// Handle held by views that want to open conversations.
#[derive(Debug, Clone)]
pub struct OpenChatSender {
    tx: mpsc::UnboundedSender<OpenChatRequest>,
}

impl OpenChatSender {
    /// Dispatch a request; returns `false` when the chat side is gone.
    pub fn request(&self, request: OpenChatRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}

pub fn open_chat_channel() -> (OpenChatSender, OpenChatReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OpenChatSender { tx }, rx)
}
