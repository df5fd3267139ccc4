//! Terminal rendering adapter.
//!
//! Turns view-model state into text. The transcript is printed
//! incrementally: only entries appended since the last call are written, and
//! the whole transcript is reprinted when its epoch changes.

use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};

use super::state::{session_row_text, SessionView};
use super::time::{message_time_label, relative_time};
use super::transcript::{Entry, EntryKind};
use crate::models::{short_id, Message, Session, SessionSummary};

/// Prompts offered on the welcome panel, sendable with `/prompt N`.
pub const QUICK_PROMPTS: &[(&str, &str)] = &[
    ("Hi, tell me about yourself", "Learn what the assistant can do"),
    ("What's the weather like today?", "Get weather information and advice"),
    ("Tell me a joke", "Relax and have a laugh"),
    ("How do I set a reminder?", "Help remembering important things"),
];

/// Incremental transcript printer.
#[derive(Debug, Default)]
pub struct Renderer {
    epoch: Option<u64>,
    printed_upto: Option<u64>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print whatever changed in the transcript since the last call.
    pub fn flush(&mut self, view: &SessionView, out: &mut impl Write) -> io::Result<()> {
        let transcript = view.transcript();
        let now = Local::now();

        if self.epoch != Some(transcript.epoch()) {
            self.epoch = Some(transcript.epoch());
            self.printed_upto = None;
            writeln!(out)?;
            writeln!(out, "{}", session_header(view))?;
            if transcript.is_welcome() {
                write!(out, "{}", welcome_panel())?;
            }
        }

        for entry in transcript.entries() {
            if self.printed_upto.is_some_and(|upto| entry.seq <= upto) {
                continue;
            }
            writeln!(out, "{}", render_entry(entry, &now))?;
            self.printed_upto = Some(entry.seq);
        }
        out.flush()
    }
}

/// Header line naming the active session and connection state.
pub fn session_header(view: &SessionView) -> String {
    let status = if view.is_connected() {
        "connected"
    } else {
        "disconnected"
    };
    format!(
        "== Session {} [{status}] {}",
        short_id(view.session_id()),
        Local::now().format("%H:%M")
    )
}

/// One transcript entry. Message content is never truncated.
pub fn render_entry(entry: &Entry, now: &DateTime<Local>) -> String {
    match &entry.kind {
        EntryKind::Message { message, shown_at } => render_message(message, *shown_at, now),
        EntryKind::Banner { title, count } => format!("-- {title} ({count} messages) --"),
        EntryKind::Thinking(_) => "[Assistant] thinking...".to_string(),
    }
}

fn render_message(message: &Message, shown_at: DateTime<Utc>, now: &DateTime<Local>) -> String {
    let at = message.created_at.unwrap_or(shown_at).with_timezone(&Local);
    format!(
        "[{}] {}\n{}",
        message.role.display_name(),
        message_time_label(now, &at),
        message.content
    )
}

/// Welcome panel listing the quick prompts.
pub fn welcome_panel() -> String {
    use std::fmt::Write as _;

    let mut panel = String::from(
        "Welcome! Ask a question, or pick a quick prompt with /prompt N:\n",
    );
    for (i, (prompt, hint)) in QUICK_PROMPTS.iter().enumerate() {
        let _ = writeln!(panel, "  {}. {prompt}  ({hint})", i + 1);
    }
    panel
}

/// Session list, marking the active session.
pub fn render_sessions(view: &SessionView, filter: &str) -> String {
    let now = Utc::now();
    let visible = view.visible_sessions(filter, now);

    if view.sessions().is_empty() {
        return "No conversations yet. Past sessions show up here once you start chatting."
            .to_string();
    }
    if visible.is_empty() {
        return format!("No sessions match \"{filter}\".");
    }

    let mut lines = Vec::with_capacity(visible.len() + 2);
    if view.sessions_from_cache() {
        lines.push("(server unreachable, showing cached sessions)".to_string());
    }
    lines.push(format!("  {:<28} {}", "ID", "SESSION"));
    for session in visible {
        let marker = if view.is_active(session) { '*' } else { ' ' };
        lines.push(format!(
            "{marker} {:<28} {}",
            session.session_id,
            session_row_text(session, now)
        ));
    }
    lines.join("\n")
}

/// Summary block for one session.
pub fn render_summary(summary: &SessionSummary) -> String {
    let now = Local::now();
    let when = |at: Option<DateTime<Utc>>| {
        at.map_or_else(
            || "-".to_string(),
            |t| relative_time(&now, &t.with_timezone(&Local)),
        )
    };
    format!(
        "Session:       {}\nTitle:         {}\nMessages:      {}\nCreated:       {}\nLast activity: {}",
        summary.session_id,
        summary.title,
        summary.total_messages,
        when(summary.created_at),
        when(summary.last_activity),
    )
}

/// One-line description for a session row, used in confirmation prompts.
pub fn describe_session(session_id: &str, sessions: &[Session]) -> String {
    sessions
        .iter()
        .find(|s| s.session_id == session_id)
        .filter(|s| !s.last_message.is_empty())
        .map_or_else(
            || format!("\"{}\"", short_id(session_id)),
            |s| format!("\"{}\" ({})", short_id(session_id), s.last_message),
        )
}
