//! Interactive chat loop.
//!
//! One task owns the controller and processes stdin lines, completions of
//! spawned remote calls, and probe ticks in arrival order. Input handling
//! never awaits a remote call; every call is spawned and reports back.

use std::io;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::commands::is_yes;
use super::controller::{Completion, Controller};
use crate::api::ClearScope;
use crate::config::Config;
use crate::view::render::{describe_session, render_sessions, render_summary, QUICK_PROMPTS};
use crate::view::{NewSession, Renderer};

const HELP: &str = "\
Commands:
  <text>                 Send a message
  /prompt N              Send quick prompt N
  /new                   Start a new conversation
  /sessions [filter]     List sessions
  /switch <id>           Switch to a session
  /history               Reload the active session
  /summary [id]          Show a session summary
  /delete <id>           Delete a session
  /clear <phrase> [N]    Delete all sessions (keep the N latest)
  /status                Check the server connection
  /help                  Show this help
  /quit                  Exit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Prompt(usize),
    New,
    Sessions(String),
    Switch(String),
    History,
    Summary(Option<String>),
    Delete(String),
    Clear { phrase: String, keep_latest: Option<u32> },
    Status,
    Help,
    Quit,
    /// A slash command that could not be understood.
    Invalid(String),
}

/// Parse one line typed at the prompt.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    match (name, rest.as_slice()) {
        ("new", []) => Input::New,
        ("sessions" | "ls", filter) => Input::Sessions(filter.join(" ")),
        ("switch" | "load", [id]) => Input::Switch((*id).to_string()),
        ("history", []) => Input::History,
        ("summary", []) => Input::Summary(None),
        ("summary", [id]) => Input::Summary(Some((*id).to_string())),
        ("delete" | "rm", [id]) => Input::Delete((*id).to_string()),
        ("clear", [phrase]) => Input::Clear {
            phrase: (*phrase).to_string(),
            keep_latest: None,
        },
        ("clear", [phrase, n]) => n.parse().map_or_else(
            |_| Input::Invalid(format!("not a number: {n}")),
            |keep| Input::Clear {
                phrase: (*phrase).to_string(),
                keep_latest: Some(keep),
            },
        ),
        ("prompt", [n]) => match n.parse::<usize>() {
            Ok(n) if (1..=QUICK_PROMPTS.len()).contains(&n) => Input::Prompt(n),
            _ => Input::Invalid(format!(
                "quick prompts are numbered 1 to {}",
                QUICK_PROMPTS.len()
            )),
        },
        ("status", []) => Input::Status,
        ("help" | "?", _) => Input::Help,
        ("quit" | "exit" | "q", []) => Input::Quit,
        _ => Input::Invalid(format!("unknown command: /{command}")),
    }
}

/// A destructive action waiting for a yes/no answer on the next line.
#[derive(Debug)]
enum Pending {
    NewSession,
    Delete(String),
}

struct Repl {
    ctl: Controller,
    renderer: Renderer,
    tx: mpsc::UnboundedSender<Completion>,
    awaiting: Option<Pending>,
}

pub async fn run(ctl: Controller, config: &Config) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut repl = Repl {
        ctl,
        renderer: Renderer::new(),
        tx,
        awaiting: None,
    };

    let id = repl.ctl.view().session_id().to_string();
    repl.ctl.spawn_switch(&id, &repl.tx);
    repl.ctl.spawn_list(&repl.tx);
    repl.ctl.spawn_probe(false, &repl.tx);
    repl.render()?;
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut probe = interval(config.probe_interval);
    probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
    probe.tick().await;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if !repl.handle_line(&line) {
                    break;
                }
            }
            Some(completion) = rx.recv() => {
                repl.handle_completion(completion);
            }
            _ = probe.tick() => {
                repl.ctl.spawn_probe(false, &repl.tx);
            }
        }
        repl.render()?;
    }

    Ok(())
}

impl Repl {
    fn render(&mut self) -> io::Result<()> {
        self.renderer.flush(self.ctl.view(), &mut io::stdout().lock())
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Summary(_, Ok(summary)) => println!("{}", render_summary(&summary)),
            Completion::Listing(filter, outcome) => {
                self.ctl.apply(Completion::Sessions(outcome), &self.tx);
                println!("{}", render_sessions(self.ctl.view(), &filter));
            }
            completion => {
                self.ctl.apply(completion, &self.tx);
            }
        }
    }

    /// Handle one input line. Returns `false` to quit.
    fn handle_line(&mut self, line: &str) -> bool {
        if let Some(pending) = self.awaiting.take() {
            self.answer(pending, is_yes(line));
            return true;
        }

        let input = parse_input(line);
        debug!(?input, "input");
        match input {
            Input::Message(text) => {
                self.ctl.spawn_send(&text, &self.tx);
            }
            Input::Prompt(n) => {
                let (prompt, _) = QUICK_PROMPTS[n - 1];
                self.ctl.spawn_send(prompt, &self.tx);
            }
            Input::New => {
                if self.ctl.start_new_session(false) == NewSession::NeedsConfirmation {
                    self.ask(
                        Pending::NewSession,
                        "Starting a new conversation will clear the current one. Continue?",
                    );
                }
            }
            Input::Sessions(filter) => self.ctl.spawn_listing(&filter, &self.tx),
            Input::Switch(id) => self.ctl.spawn_switch(&id, &self.tx),
            Input::History => {
                let id = self.ctl.view().session_id().to_string();
                self.ctl.spawn_switch(&id, &self.tx);
            }
            Input::Summary(id) => {
                let id = id.unwrap_or_else(|| self.ctl.view().session_id().to_string());
                self.ctl.spawn_summary(&id, &self.tx);
            }
            Input::Delete(id) => {
                let what = describe_session(&id, self.ctl.view().sessions());
                self.ask(Pending::Delete(id), &format!("Delete session {what}?"));
            }
            Input::Clear {
                phrase,
                keep_latest,
            } => {
                let scope = keep_latest.map_or(ClearScope::All, ClearScope::KeepLatest);
                self.ctl.spawn_clear(scope, &phrase, &self.tx);
            }
            Input::Status => self.ctl.spawn_probe(true, &self.tx),
            Input::Help => println!("{HELP}"),
            Input::Quit => return false,
            Input::Invalid(reason) => println!("{reason} (try /help)"),
        }
        true
    }

    fn ask(&mut self, pending: Pending, question: &str) {
        println!("{question} [y/N]");
        self.awaiting = Some(pending);
    }

    fn answer(&mut self, pending: Pending, yes: bool) {
        if !yes {
            println!("Cancelled.");
            return;
        }
        match pending {
            Pending::NewSession => {
                self.ctl.start_new_session(true);
            }
            Pending::Delete(id) => self.ctl.spawn_delete(&id, &self.tx),
        }
    }
}
