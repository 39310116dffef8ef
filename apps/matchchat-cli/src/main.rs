//! Demo driver: runs the chat client against a canned in-memory backend and
//! prints the merged conversation state as it converges.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Parser;
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use matchchat_client::{
    BackendError, ChatClient, ChatNotice, ClientConfig, MatchBackend,
};
use matchchat_core::{ChatSnapshot, CurrentUser, OpenChatRequest, PartyRole, TextSegment};

#[derive(Parser, Debug)]
#[command(name = "matchchat-cli", about = "Drive the MatchChat client against demo data")]
struct Args {
    /// Signed-in user id
    #[arg(long, default_value = "R1")]
    user_id: String,

    /// Signed-in user display name
    #[arg(long, default_value = "Dana Park")]
    user_name: String,

    /// Side of the marketplace: recruiter or candidate
    #[arg(long, default_value = "recruiter")]
    role: String,

    /// Feed poll interval in milliseconds
    #[arg(long, default_value_t = 300)]
    poll_millis: u64,
}

/// Canned backend covering every payload shape the decoder handles.
struct DemoBackend {
    conversations: Vec<Value>,
    messages: Mutex<HashMap<String, Vec<Value>>>,
    candidates: HashMap<String, Value>,
    matches: HashMap<String, Value>,
}

impl DemoBackend {
    fn new() -> Self {
        let conversations = vec![
            json!({
                "match_id": "m-1",
                "candidate_id": "C1",
                "recruiter_id": "R1",
                "candidate_name": "Ada Lovelace",
                "candidate_avatar": "https://cdn.example/ada.png",
                "last_message": { "html": "<p>My portfolio: <a href='https://ada.dev'>here</a></p>" },
                "last_message_at": 1_700_000_000,
            }),
            // alias-style record with no names; resolved via detail lookup
            json!({
                "matchId": "m-2",
                "candidateId": "C2",
                "recruiterId": "R1",
            }),
            // duplicate of m-1, dropped by the merger
            json!({
                "match_id": "m-1",
                "candidate_name": "Not Ada",
            }),
        ];

        let messages = HashMap::from([
            (
                "m-1".to_string(),
                vec![
                    json!({ "id": "1", "sender_id": "C1", "content": "Hi! Thanks for the match." }),
                    json!({ "id": "2", "sender_id": "C1", "html": "<p>My portfolio: <a href='https://ada.dev'>here</a></p>" }),
                    json!({ "id": "3", "sender_id": "R1", "text": "Looks great, see www.initech.jobs for the role" }),
                ],
            ),
            (
                "m-2".to_string(),
                vec![
                    json!({ "id": "1", "sender_id": "C2", "blocks": [
                        { "text": "Hello!" },
                        { "text": "Is the position still open?" },
                    ]}),
                    json!({ "id": "2", "sender_id": "C2", "entities": [
                        { "url": "https://grace.codes/resume" },
                    ]}),
                ],
            ),
        ]);

        let candidates = HashMap::from([
            (
                "C2".to_string(),
                json!({ "fullName": "Grace Hopper", "avatarUrl": "https://cdn.example/grace.png" }),
            ),
        ]);

        let matches = HashMap::from([
            ("m-1".to_string(), json!({ "candidate_id": "C1", "recruiter_id": "R1" })),
            ("m-2".to_string(), json!({ "candidate_id": "C2", "recruiter_id": "R1" })),
        ]);

        Self {
            conversations,
            messages: Mutex::new(messages),
            candidates,
            matches,
        }
    }
}

#[async_trait]
impl MatchBackend for DemoBackend {
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
        Err(BackendError::NotFound(id.to_string()))
    }

    async fn match_details(&self, match_id: &str) -> Result<Value, BackendError> {
        self.matches
            .get(match_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(match_id.to_string()))
    }

    async fn send_message(&self, match_id: &str, text: &str) -> Result<(), BackendError> {
        let mut messages = self.messages.lock().unwrap();
        let thread = messages.entry(match_id.to_string()).or_default();
        let id = format!("srv-{}", thread.len() + 1);
        thread.push(json!({ "id": id, "sender_id": "R1", "content": text }));
        Ok(())
    }
}

fn print_snapshot(snapshot: &ChatSnapshot) {
    println!("conversations:");
    for row in &snapshot.conversations {
        let marker = if row.is_active { "*" } else { " " };
        let last = row.last.as_deref().unwrap_or("-");
        let age = row
            .last_age
            .as_deref()
            .map(|a| format!(" ({a} ago)"))
            .unwrap_or_default();
        println!("  {marker} {:<16} {last}{age}", row.name);
    }

    if !snapshot.messages.is_empty() {
        println!("active thread:");
        for message in &snapshot.messages {
            let who = if message.from_me { "me" } else { "them" };
            let rendered: String = message
                .segments
                .iter()
                .map(|segment| match segment {
                    TextSegment::Plain(text) => text.clone(),
                    TextSegment::Link(url) => format!("[{url}]"),
                })
                .collect();
            println!("  {who:>4}: {rendered}");
        }
    }
    if let Some(draft) = &snapshot.draft {
        println!("draft: {draft}");
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let role = match args.role.as_str() {
        "recruiter" => PartyRole::Recruiter,
        "candidate" => PartyRole::Candidate,
        other => bail!("unknown role '{other}', expected recruiter or candidate"),
    };
    let user = CurrentUser::new(args.user_id, role).with_name(args.user_name);

    let config = ClientConfig {
        poll_interval: Duration::from_millis(args.poll_millis),
        ..Default::default()
    };
    let client = ChatClient::with_config(Arc::new(DemoBackend::new()), user, config);
    let mut notices = client.take_notices().expect("fresh client");

    client.start().await;
    info!("client started");

    // let the initial load, the first feed batch and the name lookups settle
    let settle = tokio::time::sleep(Duration::from_millis(args.poll_millis * 3));
    tokio::pin!(settle);
    loop {
        tokio::select! {
            _ = &mut settle => break,
            Some(notice) = notices.recv() => match notice {
                ChatNotice::NameResolved { name, .. } => info!(%name, "name resolved"),
                ChatNotice::FeedUpdated { match_id } => info!(%match_id, "feed updated"),
                _ => {}
            }
        }
    }
    print_snapshot(&client.snapshot());

    // a sibling view asks for the second match
    client.open_conversation(
        OpenChatRequest::for_match("m-2").with_initial_message("Yes, it is! When can you talk?"),
    );
    tokio::time::sleep(Duration::from_millis(args.poll_millis * 2)).await;
    print_snapshot(&client.snapshot());

    // send the prefilled draft
    let draft = client.snapshot().draft.unwrap_or_default();
    if !draft.is_empty() {
        client.send(&draft).await?;
        tokio::time::sleep(Duration::from_millis(args.poll_millis * 2)).await;
        print_snapshot(&client.snapshot());
    }

    client.shutdown();
    Ok(())
}
