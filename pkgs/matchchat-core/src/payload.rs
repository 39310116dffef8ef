//! Wire payload decoding.
//!
//! The hosted backend returns loosely shaped JSON: the same concept shows up
//! under several field names depending on which RPC produced the record, and
//! message bodies arrive as plain strings, HTML, entity/block collections or
//! nested objects. Everything is decoded exactly once, here, into typed
//! structs; the rest of the crate matches on the decoded types and never
//! probes field names again.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MATCH_ID_KEYS: &[&str] = &["match_id", "matchId", "matchID", "id"];
const CANDIDATE_ID_KEYS: &[&str] = &["candidate_id", "candidateId", "candidate"];
const RECRUITER_ID_KEYS: &[&str] = &["recruiter_id", "recruiterId", "recruiter"];
const SENDER_ID_KEYS: &[&str] = &["sender_id", "senderId", "from_id", "fromId", "from"];
const RECEIVER_ID_KEYS: &[&str] = &["receiver_id", "receiverId", "to_id", "toId", "to"];
const CANDIDATE_NAME_KEYS: &[&str] = &["candidate_name", "candidateName"];
const RECRUITER_NAME_KEYS: &[&str] = &["recruiter_name", "recruiterName", "company_name", "companyName"];
const SENDER_NAME_KEYS: &[&str] = &["sender_name", "senderName", "from_name", "fromName"];
const RECEIVER_NAME_KEYS: &[&str] = &["receiver_name", "receiverName", "to_name", "toName"];
const CANDIDATE_AVATAR_KEYS: &[&str] = &["candidate_avatar", "candidateAvatar", "candidate_photo"];
const RECRUITER_AVATAR_KEYS: &[&str] = &["recruiter_avatar", "recruiterAvatar", "company_logo", "companyLogo"];
const LAST_MESSAGE_KEYS: &[&str] = &["last_message", "lastMessage", "last"];
const LAST_TIME_KEYS: &[&str] = &["last_message_at", "lastMessageAt", "last_time", "lastTime", "updated_at", "updatedAt"];

const MESSAGE_ID_KEYS: &[&str] = &["id", "message_id", "messageId", "_id"];
const MESSAGE_SENDER_KEYS: &[&str] = &["sender_id", "senderId", "from_id", "fromId", "from", "user_id", "userId", "sender"];
const MESSAGE_TIME_KEYS: &[&str] = &["created_at", "createdAt", "sent_at", "sentAt", "time", "timestamp"];
const TEXT_KEYS: &[&str] = &["text", "content", "body", "message"];
const HTML_KEYS: &[&str] = &["html", "html_body", "htmlBody", "body_html", "bodyHtml"];
const WRAPPER_KEYS: &[&str] = &["content", "message", "body", "payload", "data"];
const ENTITY_URL_KEYS: &[&str] = &["url", "href", "link"];

/// First non-empty string found under any of the given keys.
pub fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    let obj = value.as_object()?;
    for key in keys {
        match obj.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First parseable timestamp under any of the given keys.
///
/// Accepts RFC 3339 strings and numeric epoch values. Numbers below 10^12
/// are treated as seconds, larger ones as milliseconds.
pub fn time_field(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    let obj = value.as_object()?;
    for key in keys {
        let parsed = match obj.get(*key) {
            Some(Value::String(s)) => parse_time_str(s),
            Some(Value::Number(n)) => n.as_i64().and_then(epoch_to_utc),
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    s.parse::<i64>().ok().and_then(epoch_to_utc)
}

fn epoch_to_utc(raw: i64) -> Option<DateTime<Utc>> {
    if raw.abs() < 1_000_000_000_000 {
        Utc.timestamp_opt(raw, 0).single()
    } else {
        Utc.timestamp_millis_opt(raw).single()
    }
}

/// A conversation record as fetched, with every ambiguous field probed once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawConversation {
    pub match_id: Option<String>,
    pub candidate_id: Option<String>,
    pub recruiter_id: Option<String>,
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub candidate_name: Option<String>,
    pub recruiter_name: Option<String>,
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
    pub candidate_avatar: Option<String>,
    pub recruiter_avatar: Option<String>,
    pub last_message: Option<Value>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl RawConversation {
    pub fn from_value(value: &Value) -> Self {
        // "id" doubles as the match id only when no dedicated key is present
        let match_id = string_field(value, &MATCH_ID_KEYS[..3])
            .or_else(|| string_field(value, &MATCH_ID_KEYS[3..]));

        Self {
            match_id,
            candidate_id: string_field(value, CANDIDATE_ID_KEYS),
            recruiter_id: string_field(value, RECRUITER_ID_KEYS),
            sender_id: string_field(value, SENDER_ID_KEYS),
            receiver_id: string_field(value, RECEIVER_ID_KEYS),
            candidate_name: string_field(value, CANDIDATE_NAME_KEYS),
            recruiter_name: string_field(value, RECRUITER_NAME_KEYS),
            sender_name: string_field(value, SENDER_NAME_KEYS),
            receiver_name: string_field(value, RECEIVER_NAME_KEYS),
            candidate_avatar: string_field(value, CANDIDATE_AVATAR_KEYS),
            recruiter_avatar: string_field(value, RECRUITER_AVATAR_KEYS),
            last_message: value
                .as_object()
                .and_then(|obj| LAST_MESSAGE_KEYS.iter().find_map(|k| obj.get(*k)))
                .cloned(),
            last_message_at: time_field(value, LAST_TIME_KEYS),
        }
    }
}

/// Decoded message body.
///
/// Decode priority mirrors the shapes the backend is known to emit: a bare
/// string, a plain-text field (unless an HTML field is also present, in which
/// case HTML wins), an HTML field, a collection of link entities, a collection
/// of text blocks, or anything else kept opaque for the deep-walk fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageContent {
    Text { text: String },
    Html { html: String },
    Entities { urls: Vec<String> },
    Blocks { texts: Vec<String> },
    Opaque { value: Value },
}

impl MessageContent {
    pub fn from_value(value: &Value) -> Self {
        if let Value::String(s) = value {
            return MessageContent::Text { text: s.clone() };
        }

        if let Some(html) = string_field(value, HTML_KEYS) {
            return MessageContent::Html { html };
        }
        if let Some(text) = string_field(value, TEXT_KEYS) {
            return MessageContent::Text { text };
        }
        if let Some(urls) = entity_urls(value) {
            return MessageContent::Entities { urls };
        }
        if let Some(texts) = block_texts(value) {
            return MessageContent::Blocks { texts };
        }

        // one level of wrapping ({content: {...}}) is common; recurse into it
        if let Some(obj) = value.as_object() {
            for key in WRAPPER_KEYS {
                if let Some(inner) = obj.get(*key) {
                    if inner.is_object() || inner.is_array() {
                        return MessageContent::from_value(inner);
                    }
                }
            }
        }

        MessageContent::Opaque {
            value: value.clone(),
        }
    }
}

fn entity_urls(value: &Value) -> Option<Vec<String>> {
    let entities = value.as_object()?.get("entities")?.as_array()?;
    let urls: Vec<String> = entities
        .iter()
        .filter_map(|e| string_field(e, ENTITY_URL_KEYS))
        .collect();
    if urls.is_empty() {
        None
    } else {
        Some(urls)
    }
}

fn block_texts(value: &Value) -> Option<Vec<String>> {
    let blocks = value.as_object()?.get("blocks")?.as_array()?;
    let texts: Vec<String> = blocks
        .iter()
        .filter_map(|b| string_field(b, TEXT_KEYS))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts)
    }
}

/// A message record as fetched from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: Option<String>,
    pub sender_id: Option<String>,
    pub content: MessageContent,
    pub sent_at: Option<DateTime<Utc>>,
}

impl RawMessage {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: string_field(value, MESSAGE_ID_KEYS),
            sender_id: string_field(value, MESSAGE_SENDER_KEYS),
            content: MessageContent::from_value(value),
            sent_at: time_field(value, MESSAGE_TIME_KEYS),
        }
    }
}
