//! Validation, normalization, and persistence of inbound posts.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;
use uuid::Uuid;

use crate::error::{ChatError, ChatResult};
use crate::message::Message;
use crate::sanitize;
use crate::storage::Store;

/// Display names are capped at 64 characters, message bodies at 2000.
/// Both limits count characters, not bytes, so multi-byte text is never split.
pub const MAX_NAME_CHARS: usize = 64;
pub const MAX_TEXT_CHARS: usize = 2000;

/// Accepts posts and serves the message log over an injected [`Store`].
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn Store>,
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Turn an inbound `(name, text)` pair into a canonical, persisted
    /// message and return the stored record.
    ///
    /// Both fields are trimmed, length-capped, and entity-escaped before
    /// anything touches the store; escaping has no bypass path. A fresh
    /// opaque id and the current unix timestamp are assigned here.
    pub fn append_message(&self, name: &str, text: &str) -> ChatResult<Message> {
        let name = name.trim();
        let text = text.trim();
        if name.is_empty() || text.is_empty() {
            return Err(ChatError::Validation);
        }
        let msg = Message {
            id: Uuid::new_v4().to_string(),
            name: sanitize::escape(truncate_chars(name, MAX_NAME_CHARS)),
            text: sanitize::escape(truncate_chars(text, MAX_TEXT_CHARS)),
            ts: unix_now(),
        };
        self.store.append(&msg)?;
        info!(id = %msg.id, name = %msg.name, "message accepted");
        Ok(msg)
    }

    /// Full message log sorted ascending by timestamp. The sort is stable,
    /// so messages sharing a timestamp keep their insertion order.
    pub fn list_messages(&self) -> ChatResult<Vec<Message>> {
        let mut msgs = self.store.load_messages()?;
        msgs.sort_by_key(|m| m.ts);
        Ok(msgs)
    }

    /// Distinct display names seen so far, in first-seen order.
    pub fn list_users(&self) -> ChatResult<Vec<String>> {
        self.store.load_users()
    }
}

/// Current unix time in seconds; a pre-epoch clock reads as zero.
fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Cap `s` at `max` characters without splitting one.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
