//! MatchChat core - conversation reconciliation for the hiring client
//!
//! The hosted backend owns matching, persistence and delivery; this crate
//! owns making sense of what it sends back. It merges conversation metadata
//! from three partial, asynchronous and sometimes conflicting sources (the
//! initial list fetch, the per-conversation message feed, and open-chat
//! requests from sibling views) into one consistent, deduplicated list.
//!
//! # Architecture
//!
//! - **payload**: one-time decode of loose JSON wire records into typed
//!   structs, including the [`MessageContent`] sum type
//! - **content**: canonical display text for any message shape, plus
//!   link segmentation for rendering
//! - **identity**: deciding who "the other party" of a conversation is and
//!   picking their best display name and avatar
//! - **state**: the [`ChatState`] reducer holding the authoritative
//!   conversation list
//! - **events**: typed open-chat request payloads exchanged between views
//!
//! Everything here is synchronous and side-effect free; the async service
//! wrapping the backend collaborators lives in `matchchat-client`.

pub mod content;
pub mod events;
pub mod identity;
pub mod models;
pub mod payload;
pub mod state;

pub use content::{linkify, TextSegment};
pub use events::{OpenChatRequest, RequestOrigin};
pub use identity::{
    resolve_other_party, CurrentUser, NameConfidence, ParticipantDetail, PartyRole, ResolvedParty,
};
pub use models::{ChatMessage, ChatSnapshot, Conversation, ConversationRow, ListPhase, MessageView};
pub use payload::{MessageContent, RawConversation, RawMessage};
pub use state::{ChatState, OpenOutcome};
