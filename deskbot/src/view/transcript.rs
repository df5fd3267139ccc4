//! The in-memory transcript of the active session.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Message;

/// Identifies one in-flight chat call and its thinking indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an entry shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A chat or system message.
    Message {
        message: Message,
        /// Local time the message was shown, for messages without a server timestamp.
        shown_at: DateTime<Utc>,
    },
    /// Header of a loaded history.
    Banner { title: String, count: usize },
    /// "Assistant is thinking" placeholder for one call.
    Thinking(CallId),
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Position in append order, never reused within an epoch.
    pub seq: u64,
    pub kind: EntryKind,
}

/// Ordered transcript entries.
///
/// `epoch` changes whenever the transcript is replaced wholesale, so an
/// incremental renderer knows to start over.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    next_seq: u64,
    epoch: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Drop every entry and start a new epoch.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
        self.epoch += 1;
    }

    /// Drop every entry, start a new epoch, and return what was dropped.
    pub fn take(&mut self) -> Vec<Entry> {
        let entries = std::mem::take(&mut self.entries);
        self.reset();
        entries
    }

    pub(super) fn push(&mut self, kind: EntryKind) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { seq, kind });
        seq
    }

    pub fn push_message(&mut self, message: Message) -> u64 {
        self.push(EntryKind::Message {
            message,
            shown_at: Utc::now(),
        })
    }

    pub fn push_system(&mut self, content: impl Into<String>) -> u64 {
        self.push_message(Message::system(content))
    }

    pub fn push_banner(&mut self, title: String, count: usize) -> u64 {
        self.push(EntryKind::Banner { title, count })
    }

    pub fn push_thinking(&mut self, call: CallId) -> u64 {
        self.push(EntryKind::Thinking(call))
    }

    /// Remove the indicator for `call`. Returns whether it was present.
    pub fn remove_thinking(&mut self, call: CallId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !matches!(e.kind, EntryKind::Thinking(c) if c == call));
        self.entries.len() != before
    }

    /// Messages in order, without banners and indicators.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|e| match &e.kind {
            EntryKind::Message { message, .. } => Some(message),
            _ => None,
        })
    }

    #[cfg(test)]
    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    /// Number of user and assistant messages.
    pub fn conversation_len(&self) -> usize {
        self.messages().filter(|m| m.role.is_conversation()).count()
    }

    /// Calls whose indicator is still shown.
    pub fn pending_calls(&self) -> Vec<CallId> {
        self.entries
            .iter()
            .filter_map(|e| match e.kind {
                EntryKind::Thinking(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// The transcript shows the welcome panel when it holds no conversation.
    pub fn is_welcome(&self) -> bool {
        self.conversation_len() == 0 && self.pending_calls().is_empty()
    }

    #[cfg(test)]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages().last()
    }
}
