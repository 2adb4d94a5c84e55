//! Chat message model.

use serde::{Deserialize, Serialize};

/// A single chat entry persisted on disk and served to clients.
///
/// `name` and `text` always hold the entity-escaped form — the store never
/// contains raw user input. Once created a message is immutable.
///
/// ```json
/// {
///   "id": "9f2c6b1e-4a9d-4d11-8c0f-2e9b8a7d3c55",
///   "name": "alice",
///   "text": "hello &amp; welcome",
///   "ts": 1700000000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Opaque unique identifier assigned at acceptance time.
    pub id: String,
    /// Sender display name (escaped, at most 64 characters).
    pub name: String,
    /// Message body (escaped, at most 2000 characters).
    pub text: String,
    /// Unix timestamp in seconds at acceptance time.
    pub ts: u64,
}
