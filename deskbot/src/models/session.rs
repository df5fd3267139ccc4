//! Session models as reported by the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// One row of the session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier.
    pub session_id: String,
    /// Preview of the most recent message, possibly empty.
    #[serde(default)]
    pub last_message: String,
    /// Number of stored messages.
    #[serde(default)]
    pub message_count: u64,
    /// Time of the most recent message.
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub last_activity: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            last_message: String::new(),
            message_count: 0,
            last_activity: None,
        }
    }
}

/// Aggregate information about one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_lenient")]
    pub last_activity: Option<DateTime<Utc>>,
    /// First user message, already shortened by the server.
    #[serde(default)]
    pub title: String,
}

/// Shorten a session id for headers and prompts.
pub fn short_id(session_id: &str) -> String {
    match session_id.char_indices().nth(12) {
        Some((idx, _)) => format!("{}...", &session_id[..idx]),
        None => session_id.to_string(),
    }
}
