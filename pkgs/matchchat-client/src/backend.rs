//! Hosted backend collaborators.
//!
//! Matching, scoring, persistence and delivery all live server-side; the
//! client reaches them through these RPCs and treats them as black boxes.
//! Responses are raw JSON values on purpose: shape handling belongs to the
//! decode boundary in `matchchat-core`, not to transport implementations.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend unavailable")]
    Unavailable,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The remote procedure calls the chat client depends on.
#[async_trait]
pub trait MatchBackend: Send + Sync {
    /// Initial conversation list for the signed-in user.
    async fn conversations(&self) -> Result<Vec<Value>, BackendError>;

    /// Current ordered message sequence for a match.
    async fn messages(&self, match_id: &str) -> Result<Vec<Value>, BackendError>;

    /// Candidate detail record (name, avatar, ...).
    async fn candidate(&self, id: &str) -> Result<Value, BackendError>;

    /// Recruiter detail record (name, company, logo, ...).
    async fn recruiter(&self, id: &str) -> Result<Value, BackendError>;

    /// Canonical participant ids for a match.
    async fn match_details(&self, match_id: &str) -> Result<Value, BackendError>;

    /// Persist an outgoing message.
    async fn send_message(&self, match_id: &str, text: &str) -> Result<(), BackendError>;
}
