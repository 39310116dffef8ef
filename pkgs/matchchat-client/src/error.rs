use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("no active conversation")]
    NoActiveConversation,

    #[error("conversation has not been persisted yet")]
    LocalOnlyConversation,
}
