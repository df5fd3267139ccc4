//! Session view model: pure state transitions.
//!
//! Nothing here performs I/O. Each remote call is split into a `begin_*`
//! transition that captures what the call needs (including the session id at
//! call start) and a `complete_*` transition that applies the result, or
//! discards it when the active session has changed in between.

use chrono::{DateTime, Local, Utc};

use super::time::relative_time;
use super::transcript::{CallId, Transcript};
use crate::api::{ApiError, DeleteResponse, SessionMessages, CONFIRM_PHRASE};
use crate::models::{short_id, Message, MessageRole, Session};
use crate::session::generate_distinct;

const BANNER_TITLE_CHARS: usize = 30;

/// A chat call that has been started but not completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub call: CallId,
    pub session_id: String,
    pub message: String,
    /// History load the user message was appended under.
    load_seq: u64,
}

/// A history load that has been started but not completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub session_id: String,
    seq: u64,
}

/// Result of asking to send a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginSend {
    /// Blank input; nothing changed.
    Ignored,
    /// The connection is degraded; nothing changed.
    Offline,
    /// The user message and thinking indicator were appended.
    Started(PendingSend),
}

/// How a completed call was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Success,
    Failed,
    /// The active session changed, or its transcript was replaced, while the
    /// call was in flight.
    Stale,
}

/// Why a new session was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewSession {
    Started,
    /// The transcript has conversation that would be discarded.
    NeedsConfirmation,
}

/// The session-scoped view model.
#[derive(Debug)]
pub struct SessionView {
    session_id: String,
    transcript: Transcript,
    connected: bool,
    sessions: Vec<Session>,
    /// Whether `sessions` came from the local cache instead of the server.
    sessions_from_cache: bool,
    load_seq: u64,
}

impl SessionView {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            transcript: Transcript::new(),
            connected: true,
            sessions: Vec::new(),
            sessions_from_cache: false,
            load_seq: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub const fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Append a client notice.
    pub fn notify(&mut self, content: impl Into<String>) {
        self.transcript.push_system(content);
    }

    // === Sending ===

    /// Optimistically append `text` and open a call for it.
    pub fn begin_send(&mut self, text: &str) -> BeginSend {
        let text = text.trim();
        if text.is_empty() {
            return BeginSend::Ignored;
        }
        if !self.connected {
            return BeginSend::Offline;
        }

        let call = CallId::new();
        self.transcript.push_message(Message::user(text));
        self.transcript.push_thinking(call);

        BeginSend::Started(PendingSend {
            call,
            session_id: self.session_id.clone(),
            message: text.to_string(),
            load_seq: self.load_seq,
        })
    }

    /// Apply the outcome of a chat call. A reply is dropped once its session
    /// is no longer active or its transcript has been reloaded, since reloaded
    /// history already holds the stored turn.
    pub fn complete_send(
        &mut self,
        pending: &PendingSend,
        outcome: Result<String, ApiError>,
    ) -> Applied {
        if pending.session_id != self.session_id || pending.load_seq != self.load_seq {
            return Applied::Stale;
        }
        self.transcript.remove_thinking(pending.call);

        match outcome {
            Ok(reply) => {
                self.transcript.push_message(Message::assistant(reply));
                self.connected = true;
                Applied::Success
            }
            Err(e) => {
                self.transcript.push_system(format!("Send failed: {e}"));
                self.connected = false;
                Applied::Failed
            }
        }
    }

    // === Switching ===

    /// Make `session_id` active and clear the transcript until history arrives.
    pub fn begin_switch(&mut self, session_id: &str) -> PendingLoad {
        session_id.clone_into(&mut self.session_id);
        self.transcript.reset();
        self.load_seq += 1;
        PendingLoad {
            session_id: self.session_id.clone(),
            seq: self.load_seq,
        }
    }

    /// Apply loaded history. Loads for another session, or superseded loads
    /// of the same session, are discarded.
    pub fn complete_load(
        &mut self,
        pending: &PendingLoad,
        outcome: Result<SessionMessages, ApiError>,
    ) -> Applied {
        if pending.session_id != self.session_id || pending.seq != self.load_seq {
            return Applied::Stale;
        }

        // Entries appended while the load was in flight stay below the history.
        let carried = self.transcript.take();
        let applied = match outcome {
            Ok(page) if !page.messages.is_empty() => {
                let count = page.count.max(page.messages.len());
                self.transcript.push_banner(banner_title(&page.messages), count);
                for message in page.messages {
                    self.transcript.push_message(message);
                }
                self.transcript
                    .push_system(format!("Loaded {count} messages from history."));
                Applied::Success
            }
            Ok(_) => {
                self.transcript
                    .push_system("This is a new or empty session. Start chatting!");
                Applied::Success
            }
            Err(e) => {
                self.transcript
                    .push_system(format!("Failed to load session: {e}"));
                if e.is_transport() {
                    self.transcript
                        .push_system("Make sure the server is running and reachable.");
                }
                Applied::Failed
            }
        };
        for entry in carried {
            self.transcript.push(entry.kind);
        }
        applied
    }

    // === New / delete ===

    /// Start a fresh session. Without `confirmed`, refuses to discard a
    /// transcript that holds conversation.
    pub fn start_new_session(&mut self, confirmed: bool) -> NewSession {
        if self.transcript.conversation_len() > 0 && !confirmed {
            return NewSession::NeedsConfirmation;
        }

        self.session_id = generate_distinct(&self.session_id);
        self.load_seq += 1;
        self.transcript.reset();
        self.transcript.push_system("Started a new conversation.");
        NewSession::Started
    }

    /// Apply the outcome of deleting `deleted`. Deleting the active session
    /// always moves the view to a new session, even if the call failed.
    pub fn complete_delete(
        &mut self,
        deleted: &[String],
        outcome: Result<DeleteResponse, ApiError>,
    ) -> Applied {
        if deleted.iter().any(|id| *id == self.session_id) {
            self.start_new_session(true);
        }

        match outcome {
            Ok(resp) => {
                self.sessions.retain(|s| !deleted.contains(&s.session_id));
                let message = resp
                    .message
                    .unwrap_or_else(|| match (deleted, resp.deleted_count) {
                        ([one], Some(n)) => {
                            format!("Deleted session {} ({n} messages).", short_id(one))
                        }
                        ([one], None) => format!("Deleted session {}.", short_id(one)),
                        (many, _) => format!("Deleted {} sessions.", many.len()),
                    });
                self.transcript.push_system(message);
                Applied::Success
            }
            Err(e) => {
                self.transcript
                    .push_system(format!("Failed to delete session, please retry: {e}"));
                Applied::Failed
            }
        }
    }

    /// Apply the outcome of a bulk clear. The active session stays, since the
    /// server no longer holds it and the next send recreates it.
    pub fn complete_clear(&mut self, outcome: Result<DeleteResponse, ApiError>) -> Applied {
        match outcome {
            Ok(resp) => {
                let message = resp
                    .message
                    .unwrap_or_else(|| "Cleared session history.".to_string());
                self.transcript.push_system(message);
                Applied::Success
            }
            Err(ApiError::Confirmation) => {
                self.transcript.push_system(format!(
                    "Confirmation phrase does not match; type {CONFIRM_PHRASE} to confirm. \
                     Nothing was deleted."
                ));
                Applied::Failed
            }
            Err(e) => {
                self.transcript
                    .push_system(format!("Failed to clear sessions, please retry: {e}"));
                Applied::Failed
            }
        }
    }

    // === Session list ===

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub const fn sessions_from_cache(&self) -> bool {
        self.sessions_from_cache
    }

    pub fn set_sessions(&mut self, sessions: Vec<Session>, from_cache: bool) {
        self.sessions = sessions;
        self.sessions_from_cache = from_cache;
    }

    /// Sessions whose rendered row contains `filter`, case-insensitively.
    /// The underlying list is left untouched.
    pub fn visible_sessions(&self, filter: &str, now: DateTime<Utc>) -> Vec<&Session> {
        let needle = filter.trim().to_lowercase();
        self.sessions
            .iter()
            .filter(|s| {
                needle.is_empty() || session_row_text(s, now).to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn is_active(&self, session: &Session) -> bool {
        session.session_id == self.session_id
    }
}

/// Text of one session row as the list shows it. Dates are in local time.
pub fn session_row_text(session: &Session, now: DateTime<Utc>) -> String {
    let preview = if session.last_message.is_empty() {
        "New session"
    } else {
        session.last_message.as_str()
    };
    let when = session
        .last_activity
        .map(|at| relative_time(&now.with_timezone(&Local), &at.with_timezone(&Local)))
        .unwrap_or_default();
    format!("{preview} {} messages {when}", session.message_count)
        .trim_end()
        .to_string()
}

fn banner_title(messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.role == MessageRole::User)
        .map_or_else(
            || "Conversation history".to_string(),
            |m| match m.content.char_indices().nth(BANNER_TITLE_CHARS) {
                Some((idx, _)) => format!("{}...", &m.content[..idx]),
                None => m.content.clone(),
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::transcript::EntryKind;
    use chrono::Duration;

    fn status_error() -> ApiError {
        ApiError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        }
    }

    fn history(n: usize) -> SessionMessages {
        let messages = (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {i}"))
                } else {
                    Message::assistant(format!("answer {i}"))
                }
            })
            .collect();
        SessionMessages { count: n, messages }
    }

    #[test]
    fn blank_input_changes_nothing() {
        let mut view = SessionView::new("s1");
        assert_eq!(view.begin_send(""), BeginSend::Ignored);
        assert_eq!(view.begin_send("   "), BeginSend::Ignored);
        assert!(view.transcript().entries().is_empty());
    }

    #[test]
    fn send_appends_user_message_and_indicator() {
        let mut view = SessionView::new("s1");
        let BeginSend::Started(pending) = view.begin_send("  hello ") else {
            panic!("send should start");
        };
        assert_eq!(pending.message, "hello");
        assert_eq!(pending.session_id, "s1");
        assert_eq!(view.transcript().message_count(), 1);
        assert_eq!(view.transcript().pending_calls(), vec![pending.call]);

        assert_eq!(
            view.complete_send(&pending, Ok("hi".to_string())),
            Applied::Success
        );
        let roles: Vec<_> = view.transcript().messages().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
        assert!(view.transcript().pending_calls().is_empty());
    }

    #[test]
    fn failed_send_adds_exactly_one_diagnostic() {
        let mut view = SessionView::new("s1");
        let BeginSend::Started(pending) = view.begin_send("hello") else {
            panic!("send should start");
        };
        let before = view.transcript().message_count();

        assert_eq!(view.complete_send(&pending, Err(status_error())), Applied::Failed);
        assert_eq!(view.transcript().message_count(), before + 1);
        let last = view.transcript().last_message().unwrap();
        assert_eq!(last.role, MessageRole::System);
        assert!(last.content.contains("502"));
        assert!(!view.is_connected());
        assert!(view.transcript().pending_calls().is_empty());
    }

    #[test]
    fn offline_blocks_send_without_changes() {
        let mut view = SessionView::new("s1");
        view.set_connected(false);
        assert_eq!(view.begin_send("hello"), BeginSend::Offline);
        assert!(view.transcript().entries().is_empty());
    }

    #[test]
    fn overlapping_sends_resolve_independently() {
        let mut view = SessionView::new("s1");
        let BeginSend::Started(first) = view.begin_send("one") else {
            panic!()
        };
        let BeginSend::Started(second) = view.begin_send("two") else {
            panic!()
        };

        view.complete_send(&second, Ok("reply two".to_string()));
        assert_eq!(view.transcript().pending_calls(), vec![first.call]);

        view.complete_send(&first, Ok("reply one".to_string()));
        assert!(view.transcript().pending_calls().is_empty());
        assert_eq!(view.transcript().conversation_len(), 4);
    }

    #[test]
    fn stale_reply_does_not_touch_new_session() {
        let mut view = SessionView::new("a");
        let BeginSend::Started(pending) = view.begin_send("for a") else {
            panic!()
        };

        let load = view.begin_switch("b");
        view.complete_load(&load, Ok(history(2)));
        let before = view.transcript().entries().to_vec();

        assert_eq!(
            view.complete_send(&pending, Ok("late reply".to_string())),
            Applied::Stale
        );
        assert_eq!(view.transcript().entries(), before.as_slice());
        assert!(view.is_connected());
    }

    #[test]
    fn reply_after_reloading_same_session_is_not_duplicated() {
        let mut view = SessionView::new("a");
        let BeginSend::Started(pending) = view.begin_send("q") else {
            panic!()
        };

        let load = view.begin_switch("a");
        let stored = SessionMessages {
            count: 2,
            messages: vec![Message::user("q"), Message::assistant("r")],
        };
        assert_eq!(view.complete_load(&load, Ok(stored)), Applied::Success);
        let before = view.transcript().entries().to_vec();

        assert_eq!(view.complete_send(&pending, Ok("r".to_string())), Applied::Stale);
        assert_eq!(view.transcript().entries(), before.as_slice());
        let replies = view
            .transcript()
            .messages()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();
        assert_eq!(replies, 1);
    }

    #[test]
    fn reply_after_returning_to_session_is_discarded() {
        let mut view = SessionView::new("a");
        let BeginSend::Started(pending) = view.begin_send("q") else {
            panic!()
        };
        view.begin_switch("b");
        let back = view.begin_switch("a");
        view.complete_load(&back, Ok(history(2)));

        assert_eq!(view.complete_send(&pending, Ok("r".to_string())), Applied::Stale);
        assert_eq!(view.transcript().conversation_len(), 2);
    }

    #[test]
    fn send_during_load_survives_history_arrival() {
        let mut view = SessionView::new("a");
        let load = view.begin_switch("b");
        let BeginSend::Started(pending) = view.begin_send("quick one") else {
            panic!()
        };

        assert_eq!(view.complete_load(&load, Ok(history(2))), Applied::Success);
        assert_eq!(view.transcript().pending_calls(), vec![pending.call]);
        assert_eq!(
            view.transcript().messages().last().map(|m| m.content.as_str()),
            Some("quick one")
        );

        assert_eq!(view.complete_send(&pending, Ok("done".to_string())), Applied::Success);
        assert!(view.transcript().pending_calls().is_empty());
        assert_eq!(view.transcript().conversation_len(), 4);
    }

    #[test]
    fn stale_failure_does_not_degrade_connection() {
        let mut view = SessionView::new("a");
        let BeginSend::Started(pending) = view.begin_send("for a") else {
            panic!()
        };
        view.begin_switch("b");
        assert_eq!(view.complete_send(&pending, Err(status_error())), Applied::Stale);
        assert!(view.is_connected());
    }

    #[test]
    fn load_shows_banner_history_and_notice() {
        let mut view = SessionView::new("a");
        let load = view.begin_switch("b");
        assert_eq!(view.session_id(), "b");
        assert_eq!(view.complete_load(&load, Ok(history(3))), Applied::Success);

        let entries = view.transcript().entries();
        assert!(matches!(
            &entries[0].kind,
            EntryKind::Banner { title, count: 3 } if title == "question 0"
        ));
        assert_eq!(view.transcript().conversation_len(), 3);
        assert_eq!(
            view.transcript().last_message().unwrap().content,
            "Loaded 3 messages from history."
        );
    }

    #[test]
    fn empty_load_falls_back_to_welcome() {
        let mut view = SessionView::new("a");
        let load = view.begin_switch("fresh");
        assert_eq!(
            view.complete_load(&load, Ok(SessionMessages::default())),
            Applied::Success
        );
        assert!(view.transcript().is_welcome());
    }

    #[test]
    fn failed_load_shows_diagnostic_and_welcome() {
        let mut view = SessionView::new("a");
        let load = view.begin_switch("b");
        assert_eq!(view.complete_load(&load, Err(status_error())), Applied::Failed);
        assert!(view.transcript().is_welcome());
        assert_eq!(view.session_id(), "b");
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut view = SessionView::new("a");
        let first = view.begin_switch("b");
        let second = view.begin_switch("b");

        assert_eq!(view.complete_load(&second, Ok(history(2))), Applied::Success);
        let before = view.transcript().entries().to_vec();
        assert_eq!(view.complete_load(&first, Ok(history(6))), Applied::Stale);
        assert_eq!(view.transcript().entries(), before.as_slice());
    }

    #[test]
    fn new_session_requires_confirmation_with_conversation() {
        let mut view = SessionView::new("a");
        assert_eq!(view.start_new_session(false), NewSession::Started);
        let id = view.session_id().to_string();
        assert_ne!(id, "a");

        let BeginSend::Started(p) = view.begin_send("hi") else {
            panic!()
        };
        view.complete_send(&p, Ok("hello".to_string()));

        assert_eq!(view.start_new_session(false), NewSession::NeedsConfirmation);
        assert_eq!(view.session_id(), id);

        assert_eq!(view.start_new_session(true), NewSession::Started);
        assert_ne!(view.session_id(), id);
        assert_eq!(view.transcript().conversation_len(), 0);
    }

    #[test]
    fn deleting_active_session_moves_away() {
        let mut view = SessionView::new("a");
        view.complete_delete(&["a".to_string()], Ok(DeleteResponse::default()));
        assert_ne!(view.session_id(), "a");

        let current = view.session_id().to_string();
        view.complete_delete(&[current.clone()], Err(status_error()));
        assert_ne!(view.session_id(), current);
    }

    #[test]
    fn deleting_other_session_keeps_active() {
        let mut view = SessionView::new("a");
        view.set_sessions(vec![Session::new("a"), Session::new("b")], false);
        view.complete_delete(&["b".to_string()], Ok(DeleteResponse::default()));
        assert_eq!(view.session_id(), "a");
        assert_eq!(view.sessions().len(), 1);
    }

    #[test]
    fn filter_matches_rendered_row_case_insensitively() {
        let now = Utc::now();
        let mut view = SessionView::new("a");
        let mut weather = Session::new("a");
        weather.last_message = "What's the Weather?".to_string();
        weather.message_count = 4;
        weather.last_activity = Some(now - Duration::minutes(5));
        let mut joke = Session::new("b");
        joke.last_message = "Tell me a joke".to_string();
        view.set_sessions(vec![weather, joke], false);

        let ids = |v: Vec<&Session>| {
            v.into_iter()
                .map(|s| s.session_id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(view.visible_sessions("weather", now)), vec!["a"]);
        assert_eq!(ids(view.visible_sessions("MINUTES AGO", now)), vec!["a"]);
        assert_eq!(ids(view.visible_sessions("new session", now)), Vec::<String>::new());
        assert_eq!(view.visible_sessions("", now).len(), 2);
        assert_eq!(view.sessions().len(), 2);
    }

    #[test]
    fn old_rows_show_the_local_calendar_date() {
        let now = Utc::now();
        let at = now - Duration::days(10);
        let mut session = Session::new("a");
        session.last_message = "hi".to_string();
        session.last_activity = Some(at);

        let local_date = at.with_timezone(&Local).format("%Y-%m-%d").to_string();
        assert_eq!(session_row_text(&session, now), format!("hi 0 messages {local_date}"));
    }

    #[test]
    fn banner_title_is_shortened() {
        let long = "a".repeat(40);
        let title = banner_title(&[Message::system("x"), Message::user(long)]);
        assert_eq!(title, format!("{}...", "a".repeat(30)));
        assert_eq!(banner_title(&[Message::assistant("x")]), "Conversation history");
    }
}
