//! MatchChat client - async service over the hosted match backend
//!
//! [`ChatClient`] wires the pure reducer from `matchchat-core` to the
//! backend collaborators: it fetches the initial conversation list, polls
//! the active conversation's message feed, resolves other-party names
//! through detail lookups, and sends outgoing messages with optimistic
//! append and rollback.
//!
//! All state mutation goes through the reducer under one mutex, taken only
//! for synchronous reducer calls, so every merge step runs to completion
//! before the next one. In-flight work is tied to a [`CancellationToken`]:
//! shutting the client down, or switching conversations, cancels the tasks
//! that are no longer wanted instead of letting them apply stale results.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use matchchat_core::payload::string_field;
use matchchat_core::{
    ChatSnapshot, ChatState, CurrentUser, NameConfidence, OpenChatRequest, OpenOutcome,
    ParticipantDetail, PartyRole, ResolvedParty,
};

mod backend;
mod channel;
mod error;
mod models;

pub use backend::{BackendError, MatchBackend};
pub use channel::{open_chat_channel, OpenChatReceiver, OpenChatSender};
pub use error::ClientError;
pub use models::{ChatNotice, ClientConfig};

const DETAIL_CANDIDATE_KEYS: &[&str] = &["candidate_id", "candidateId", "candidate"];
const DETAIL_RECRUITER_KEYS: &[&str] = &["recruiter_id", "recruiterId", "recruiter"];

pub struct ChatClient {
    backend: Arc<dyn MatchBackend>,
    state: Arc<Mutex<ChatState>>,
    config: ClientConfig,
    notice_tx: mpsc::UnboundedSender<ChatNotice>,
    notice_rx: Mutex<Option<mpsc::UnboundedReceiver<ChatNotice>>>,
    lifetime: CancellationToken,
    feed_token: Mutex<Option<CancellationToken>>,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn MatchBackend>, user: CurrentUser) -> Self {
        Self::with_config(backend, user, ClientConfig::default())
    }

    pub fn with_config(
        backend: Arc<dyn MatchBackend>,
        user: CurrentUser,
        config: ClientConfig,
    ) -> Self {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let state = ChatState::new(user).with_history_limit(config.history_limit);
        Self {
            backend,
            state: Arc::new(Mutex::new(state)),
            config,
            notice_tx,
            notice_rx: Mutex::new(Some(notice_rx)),
            lifetime: CancellationToken::new(),
            feed_token: Mutex::new(None),
        }
    }

    /// Fetch the initial conversation list and begin following the first
    /// conversation's feed. A fetch failure is logged and leaves the list
    /// empty; nothing propagates.
    pub async fn start(&self) {
        self.sync_conversations(false).await;
    }

    /// Wholesale refetch, replacing the list. The active selection survives
    /// when its conversation is still present.
    pub async fn refresh(&self) {
        self.sync_conversations(true).await;
    }

    async fn sync_conversations(&self, is_refresh: bool) {
        let records = match self.backend.conversations().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "conversation list fetch failed");
                return;
            }
        };

        let (count, active_match) = {
            let mut state = self.state.lock().unwrap();
            state.load_conversations(&records);
            (
                state.conversations().len(),
                state.active().and_then(|c| c.match_id.clone()),
            )
        };

        let notice = if is_refresh {
            ChatNotice::ListRefreshed { count }
        } else {
            ChatNotice::ConversationsLoaded { count }
        };
        let _ = self.notice_tx.send(notice);

        self.spawn_pending_lookups();
        if let Some(match_id) = active_match {
            self.start_feed(match_id);
        }
    }

    /// Apply an open-chat request from a sibling view, then follow the
    /// newly active conversation.
    pub fn open_conversation(&self, request: OpenChatRequest) {
        let outcome = self.state.lock().unwrap().open_chat(&request);
        let (id, match_id) = match outcome {
            OpenOutcome::Ignored => return,
            OpenOutcome::Activated { id, match_id } | OpenOutcome::Created { id, match_id } => {
                (id, match_id)
            }
        };

        let _ = self
            .notice_tx
            .send(ChatNotice::ConversationOpened { id: id.clone() });

        if let Some(match_id) = match_id {
            self.start_feed(match_id.clone());
            let needs_lookup = self
                .state
                .lock()
                .unwrap()
                .conversations()
                .iter()
                .any(|c| c.id == id && c.name_confidence < NameConfidence::Verified);
            if needs_lookup {
                self.spawn_lookup(id, match_id);
            }
        }
    }

    /// Send to the active conversation with optimistic append. On failure
    /// the optimistic entry is rolled back and the text restored as the
    /// draft so the user can retry.
    pub async fn send(&self, text: &str) -> Result<(), ClientError> {
        let (match_id, message_id) = {
            let mut state = self.state.lock().unwrap();
            let match_id = match state.active() {
                Some(conv) => match conv.match_id.clone() {
                    Some(match_id) => match_id,
                    None => return Err(ClientError::LocalOnlyConversation),
                },
                None => return Err(ClientError::NoActiveConversation),
            };
            let Some(message_id) = state.append_outgoing(text, Utc::now()) else {
                return Err(ClientError::NoActiveConversation);
            };
            (match_id, message_id)
        };

        match self.backend.send_message(&match_id, text).await {
            Ok(()) => {
                self.state.lock().unwrap().confirm_outgoing(&message_id);
                let _ = self.notice_tx.send(ChatNotice::MessageSent { match_id });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, %match_id, "send failed, restoring draft");
                self.state
                    .lock()
                    .unwrap()
                    .rollback_outgoing(&message_id, text);
                let _ = self.notice_tx.send(ChatNotice::SendFailed {
                    match_id,
                    restored_text: text.to_string(),
                });
                Err(ClientError::Backend(e))
            }
        }
    }

    /// Current render model.
    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.lock().unwrap().snapshot()
    }

    pub fn set_draft(&self, draft: Option<String>) {
        self.state.lock().unwrap().set_draft(draft);
    }

    /// Take the notification receiver. Yields `None` after the first call.
    pub fn take_notices(&self) -> Option<mpsc::UnboundedReceiver<ChatNotice>> {
        self.notice_rx.lock().unwrap().take()
    }

    /// Non-blocking poll of the notification channel, for embedders that
    /// have not taken the receiver.
    pub fn try_notice(&self) -> Option<ChatNotice> {
        self.notice_rx.lock().unwrap().as_mut()?.try_recv().ok()
    }

    /// Drain open-chat requests from sibling views until the channel closes
    /// or the client shuts down.
    pub fn spawn_request_pump(self: &Arc<Self>, mut requests: OpenChatReceiver) -> JoinHandle<()> {
        let client = Arc::clone(self);
        let token = self.lifetime.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    request = requests.recv() => match request {
                        Some(request) => client.open_conversation(request),
                        None => break,
                    }
                }
            }
        })
    }

    /// Cancel all in-flight work. Safe to call more than once.
    pub fn shutdown(&self) {
        self.lifetime.cancel();
        debug!("chat client shut down");
    }

    fn spawn_pending_lookups(&self) {
        let pending = self.state.lock().unwrap().unresolved();
        for (conversation_id, match_id) in pending {
            self.spawn_lookup(conversation_id, match_id);
        }
    }

    /// Resolve one conversation's other party through the backend. Results
    /// apply in arrival order; the reducer's confidence gate makes late or
    /// repeated application harmless.
    fn spawn_lookup(&self, conversation_id: String, match_id: String) {
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let notice_tx = self.notice_tx.clone();
        let token = self.lifetime.clone();
        let user = self.state.lock().unwrap().user().clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = resolve_via_backend(backend.as_ref(), &user, &match_id) => match result {
                    Ok(Some(resolved)) => {
                        let applied = state
                            .lock()
                            .unwrap()
                            .apply_resolution(&conversation_id, &resolved);
                        if applied {
                            if let Some(name) = resolved.name {
                                let _ = notice_tx.send(ChatNotice::NameResolved {
                                    id: conversation_id,
                                    name,
                                });
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, %match_id, "identity lookup failed"),
                }
            }
        });
    }

    fn start_feed(&self, match_id: String) {
        let token = self.lifetime.child_token();
        if let Some(previous) = self.feed_token.lock().unwrap().replace(token.clone()) {
            previous.cancel();
        }

        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let notice_tx = self.notice_tx.clone();
        let interval = self.config.poll_interval;

        tokio::spawn(async move {
            debug!(%match_id, "feed poller started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match backend.messages(&match_id).await {
                            Ok(records) => {
                                let applied =
                                    state.lock().unwrap().apply_feed(&match_id, &records);
                                if applied {
                                    let _ = notice_tx.send(ChatNotice::FeedUpdated {
                                        match_id: match_id.clone(),
                                    });
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, %match_id, "message feed fetch failed");
                                let _ = notice_tx.send(ChatNotice::FeedError {
                                    match_id: match_id.clone(),
                                    error: e.to_string(),
                                });
                            }
                        }
                    }
                }
            }
            debug!(%match_id, "feed poller stopped");
        });
    }
}

/// Fetch canonical participant ids for a match, pick the other party, and
/// fetch their detail record. `Ok(None)` means the backend had nothing
/// usable; the caller keeps its placeholder.
async fn resolve_via_backend(
    backend: &dyn MatchBackend,
    user: &CurrentUser,
    match_id: &str,
) -> Result<Option<ResolvedParty>, BackendError> {
    let details = backend.match_details(match_id).await?;
    let candidate_id = string_field(&details, DETAIL_CANDIDATE_KEYS);
    let recruiter_id = string_field(&details, DETAIL_RECRUITER_KEYS);

    let (other_id, other_is_candidate) = match (candidate_id, recruiter_id) {
        (Some(candidate), Some(recruiter)) => {
            if recruiter == user.id {
                (candidate, true)
            } else if candidate == user.id {
                (recruiter, false)
            } else if user.role == PartyRole::Recruiter {
                (candidate, true)
            } else {
                (recruiter, false)
            }
        }
        (Some(candidate), None) => (candidate, true),
        (None, Some(recruiter)) => (recruiter, false),
        (None, None) => return Ok(None),
    };

    let record = if other_is_candidate {
        backend.candidate(&other_id).await?
    } else {
        backend.recruiter(&other_id).await?
    };
    let detail = ParticipantDetail::from_value(other_id.clone(), &record);
    if detail.name.is_none() {
        return Ok(None);
    }

    Ok(Some(ResolvedParty {
        party_id: Some(other_id),
        name: detail.name,
        avatar: detail.avatar,
        confidence: NameConfidence::Verified,
    }))
}
