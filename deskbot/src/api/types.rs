//! Request and response bodies of the remote store contract.

use serde::{Deserialize, Serialize};

use crate::models::{Message, Session, SessionSummary};

/// Body of `POST /chat`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
}

/// Response of `POST /chat`. Only `reply` is required.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    /// Session id the server stored the turn under, when it reports one.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response of `GET /sessions`.
#[derive(Debug, Deserialize)]
pub struct SessionsResponse {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

/// Response of `GET /sessions/{id}/messages`.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A loaded page of history for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMessages {
    /// Number of messages the server reports, which may exceed `messages.len()`.
    pub count: usize,
    pub messages: Vec<Message>,
}

/// Response of `GET /sessions/{id}/summary`.
#[derive(Debug, Deserialize)]
pub struct SummaryResponse {
    pub summary: Option<SessionSummary>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of the delete endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub deleted_count: Option<u64>,
}

/// Body of `DELETE /sessions/batch`.
#[derive(Debug, Serialize)]
pub struct BatchDeleteRequest<'a> {
    pub session_ids: &'a [String],
    pub confirm_password: &'a str,
}

/// Which sessions a bulk clear removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    /// Every session.
    All,
    /// Everything except the N most recent sessions.
    KeepLatest(u32),
}
