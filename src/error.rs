//! Error taxonomy shared by the service, store, and HTTP layer.

use thiserror::Error;

/// Failures surfaced by the chat core.
///
/// `Validation` maps to a client error (HTTP 400); everything else is a
/// server-side persistence problem (HTTP 500).
#[derive(Debug, Error)]
pub enum ChatError {
    /// Empty name or text after trimming. Never persisted.
    #[error("name and message are required")]
    Validation,

    /// Lock, write, flush, or rename failure on a persisted collection.
    #[error("failed to persist chat data: {0}")]
    Persistence(#[from] std::io::Error),

    /// Snapshot could not be encoded as JSON.
    #[error("failed to encode chat data: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type ChatResult<T> = Result<T, ChatError>;
