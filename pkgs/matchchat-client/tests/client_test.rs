// End-to-end client tests against an in-memory backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;

use matchchat_client::{
    open_chat_channel, BackendError, ChatClient, ChatNotice, ClientConfig, MatchBackend,
};
use matchchat_core::{CurrentUser, OpenChatRequest, PartyRole};

#[derive(Default)]
struct MockBackend {
    conversations: Vec<Value>,
    messages: Mutex<HashMap<String, Vec<Value>>>,
    candidates: HashMap<String, Value>,
    recruiters: HashMap<String, Value>,
    matches: HashMap<String, Value>,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MatchBackend for MockBackend {
    async fn conversations(&self) -> Result<Vec<Value>, BackendError> {
        Ok(self.conversations.clone())
    }

    async fn messages(&self, match_id: &str) -> Result<Vec<Value>, BackendError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(match_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn candidate(&self, id: &str) -> Result<Value, BackendError> {
        self.candidates
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    async fn recruiter(&self, id: &str) -> Result<Value, BackendError> {
        self.recruiters
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    async fn match_details(&self, match_id: &str) -> Result<Value, BackendError> {
        self.matches
            .get(match_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(match_id.to_string()))
    }

    async fn send_message(&self, match_id: &str, text: &str) -> Result<(), BackendError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable);
        }
        self.sent
            .lock()
            .unwrap()
            .push((match_id.to_string(), text.to_string()));
        let mut messages = self.messages.lock().unwrap();
        let thread = messages.entry(match_id.to_string()).or_default();
        let id = format!("srv-{}", thread.len() + 1);
        thread.push(json!({ "id": id, "sender_id": "R1", "content": text }));
        Ok(())
    }
}

fn backend_with_one_match() -> MockBackend {
    MockBackend {
        conversations: vec![json!({
            "match_id": "m-1",
            "candidate_id": "C1",
            "recruiter_id": "R1",
        })],
        candidates: HashMap::from([(
            "C1".to_string(),
            json!({ "name": "Ada Lovelace", "avatar": "http://cdn/ada.png" }),
        )]),
        matches: HashMap::from([(
            "m-1".to_string(),
            json!({ "candidate_id": "C1", "recruiter_id": "R1" }),
        )]),
        ..Default::default()
    }
}

fn recruiter() -> CurrentUser {
    CurrentUser::new("R1", PartyRole::Recruiter).with_name("Dana")
}

fn fast_config() -> ClientConfig {
    ClientConfig {
        poll_interval: Duration::from_millis(25),
        ..Default::default()
    }
}

async fn wait_for<F>(notices: &mut UnboundedReceiver<ChatNotice>, pred: F) -> ChatNotice
where
    F: Fn(&ChatNotice) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let notice = notices.recv().await.expect("notice channel closed");
            if pred(&notice) {
                return notice;
            }
        }
    })
    .await
    .expect("timed out waiting for notice")
}

#[tokio::test]
async fn start_loads_list_and_resolves_names() {
    let client = ChatClient::with_config(
        Arc::new(backend_with_one_match()),
        recruiter(),
        fast_config(),
    );
    let mut notices = client.take_notices().unwrap();

    client.start().await;

    let loaded = wait_for(&mut notices, |n| {
        matches!(n, ChatNotice::ConversationsLoaded { .. })
    })
    .await;
    assert_eq!(loaded, ChatNotice::ConversationsLoaded { count: 1 });

    wait_for(&mut notices, |n| matches!(n, ChatNotice::NameResolved { .. })).await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.conversations[0].name, "Ada Lovelace");
    assert_eq!(
        snapshot.conversations[0].avatar.as_deref(),
        Some("http://cdn/ada.png")
    );
    client.shutdown();
}

#[tokio::test]
async fn failed_lookup_keeps_placeholder_name() {
    let mut backend = backend_with_one_match();
    backend.matches.clear();

    let client = ChatClient::with_config(Arc::new(backend), recruiter(), fast_config());
    client.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.conversations[0].name, "conv-m-1");
    client.shutdown();
}

#[tokio::test]
async fn feed_poller_merges_messages_for_active_conversation() {
    let backend = Arc::new(backend_with_one_match());
    backend.messages.lock().unwrap().insert(
        "m-1".to_string(),
        vec![json!({ "id": "srv-1", "sender_id": "C1", "content": "hello!" })],
    );

    let client = ChatClient::with_config(backend.clone(), recruiter(), fast_config());
    let mut notices = client.take_notices().unwrap();
    client.start().await;

    wait_for(&mut notices, |n| matches!(n, ChatNotice::FeedUpdated { .. })).await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].text, "hello!");
    assert!(!snapshot.messages[0].from_me);
    assert_eq!(snapshot.conversations[0].last.as_deref(), Some("hello!"));
    client.shutdown();
}

#[tokio::test]
async fn send_reaches_backend_and_feed_catches_up() {
    let backend = Arc::new(backend_with_one_match());
    let client = ChatClient::with_config(backend.clone(), recruiter(), fast_config());
    let mut notices = client.take_notices().unwrap();
    client.start().await;

    client.send("are you free Tuesday?").await.unwrap();

    assert_eq!(
        *backend.sent.lock().unwrap(),
        vec![("m-1".to_string(), "are you free Tuesday?".to_string())]
    );

    wait_for(&mut notices, |n| matches!(n, ChatNotice::FeedUpdated { .. })).await;
    let snapshot = client.snapshot();
    assert!(snapshot
        .messages
        .iter()
        .any(|m| m.text == "are you free Tuesday?" && m.from_me));
    client.shutdown();
}

#[tokio::test]
async fn failed_send_restores_draft_and_rolls_back() {
    let backend = Arc::new(backend_with_one_match());
    backend.fail_sends.store(true, Ordering::SeqCst);

    let client = ChatClient::with_config(backend.clone(), recruiter(), fast_config());
    let mut notices = client.take_notices().unwrap();
    client.start().await;

    let result = client.send("lost in transit").await;
    assert!(result.is_err());

    let failed = wait_for(&mut notices, |n| matches!(n, ChatNotice::SendFailed { .. })).await;
    assert_eq!(
        failed,
        ChatNotice::SendFailed {
            match_id: "m-1".to_string(),
            restored_text: "lost in transit".to_string(),
        }
    );

    let snapshot = client.snapshot();
    assert_eq!(snapshot.draft.as_deref(), Some("lost in transit"));
    assert!(snapshot.messages.iter().all(|m| m.text != "lost in transit"));
    assert!(backend.sent.lock().unwrap().is_empty());
    client.shutdown();
}

#[tokio::test]
async fn open_request_for_unknown_match_synthesizes_and_polls() {
    let backend = Arc::new(backend_with_one_match());
    backend.messages.lock().unwrap().insert(
        "m-9".to_string(),
        vec![json!({ "id": "srv-1", "sender_id": "C9", "content": "hi there" })],
    );

    let client = ChatClient::with_config(backend.clone(), recruiter(), fast_config());
    let mut notices = client.take_notices().unwrap();
    client.start().await;

    client.open_conversation(
        OpenChatRequest::for_match("m-9")
            .with_name("Grace")
            .with_initial_message("Hi Grace!"),
    );

    wait_for(&mut notices, |n| {
        matches!(n, ChatNotice::FeedUpdated { match_id } if match_id == "m-9")
    })
    .await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.active_id.as_deref(), Some("m-9"));
    assert_eq!(snapshot.conversations[0].name, "Grace");
    assert_eq!(snapshot.draft.as_deref(), Some("Hi Grace!"));
    assert_eq!(snapshot.messages[0].text, "hi there");
    client.shutdown();
}

#[tokio::test]
async fn relayed_request_through_the_pump_is_ignored() {
    let client = Arc::new(ChatClient::with_config(
        Arc::new(backend_with_one_match()),
        recruiter(),
        fast_config(),
    ));
    client.start().await;
    let before = client.snapshot().conversations;

    let (sender, receiver) = open_chat_channel();
    let pump = client.spawn_request_pump(receiver);

    assert!(sender.request(OpenChatRequest::for_match("m-77").relayed()));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let after = client.snapshot().conversations;
    assert_eq!(before, after);

    client.shutdown();
    let _ = pump.await;
}

#[tokio::test]
async fn direct_request_through_the_pump_opens_the_conversation() {
    let client = Arc::new(ChatClient::with_config(
        Arc::new(backend_with_one_match()),
        recruiter(),
        fast_config(),
    ));
    let mut notices = client.take_notices().unwrap();
    client.start().await;

    let (sender, receiver) = open_chat_channel();
    let pump = client.spawn_request_pump(receiver);
    sender.request(OpenChatRequest::for_match("m-5").with_name("Joan"));

    wait_for(&mut notices, |n| {
        matches!(n, ChatNotice::ConversationOpened { id } if id == "m-5")
    })
    .await;
    assert_eq!(client.snapshot().active_id.as_deref(), Some("m-5"));

    client.shutdown();
    let _ = pump.await;
}

#[tokio::test]
async fn shutdown_stops_the_feed_poller() {
    let backend = Arc::new(backend_with_one_match());
    let client = ChatClient::with_config(backend.clone(), recruiter(), fast_config());
    client.start().await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    client.shutdown();
    backend.messages.lock().unwrap().insert(
        "m-1".to_string(),
        vec![json!({ "id": "late", "content": "after shutdown" })],
    );
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(client.snapshot().messages.is_empty());
}

#[tokio::test]
async fn verified_name_survives_reopening() {
    let client = ChatClient::with_config(
        Arc::new(backend_with_one_match()),
        recruiter(),
        fast_config(),
    );
    let mut notices = client.take_notices().unwrap();
    client.start().await;
    wait_for(&mut notices, |n| matches!(n, ChatNotice::NameResolved { .. })).await;

    // the request carries a stale explicit name; Verified must win
    client.open_conversation(OpenChatRequest::for_match("m-1").with_name("Old Name"));

    let snapshot = client.snapshot();
    assert_eq!(snapshot.conversations[0].name, "Ada Lovelace");
    assert_eq!(
        client
            .snapshot()
            .conversations
            .iter()
            .filter(|c| c.id == "m-1")
            .count(),
        1
    );
    client.shutdown();
}
