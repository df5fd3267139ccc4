//! One-shot command execution.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};

use super::args::{Cli, Commands};
use super::controller::Controller;
use super::repl;
use crate::api::ClearScope;
use crate::config::Config;
use crate::models::short_id;
use crate::view::render::{describe_session, render_sessions, render_summary};
use crate::view::{Applied, NewSession, Renderer};

pub async fn execute(cli: Cli, config: Config) -> Result<()> {
    let config = config.with_server(cli.server.as_deref());
    let mut ctl = Controller::new(&config, cli.session.as_deref())
        .context("Failed to initialize the chat client")?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => repl::run(ctl, &config).await,
        Commands::Send { message } => send(&mut ctl, &message.join(" ")).await,
        Commands::Sessions { filter } => {
            ctl.list_sessions().await;
            println!("{}", render_sessions(ctl.view(), filter.as_deref().unwrap_or("")));
            Ok(())
        }
        Commands::History { id } => {
            let applied = match id {
                Some(id) => ctl.switch_session(&id).await,
                None => ctl.reload().await,
            };
            print_transcript(&ctl)?;
            exit_status(applied)
        }
        Commands::Switch { id } => {
            let applied = ctl.switch_session(&id).await;
            print_transcript(&ctl)?;
            exit_status(applied)
        }
        Commands::New { yes } => new_session(&mut ctl, yes).await,
        Commands::Delete { id, yes } => delete(&mut ctl, &id, yes).await,
        Commands::DeleteMany { ids, confirm } => {
            let applied = ctl.delete_sessions(&ids, &confirm).await;
            print_transcript(&ctl)?;
            exit_status(applied)
        }
        Commands::Clear {
            keep_latest,
            confirm,
        } => {
            let scope = keep_latest.map_or(ClearScope::All, ClearScope::KeepLatest);
            let applied = ctl.clear_sessions(scope, &confirm).await;
            print_transcript(&ctl)?;
            exit_status(applied)
        }
        Commands::Summary { id } => {
            let id = id.unwrap_or_else(|| ctl.view().session_id().to_string());
            let summary = ctl
                .summary(&id)
                .await
                .with_context(|| format!("Failed to load summary for {}", short_id(&id)))?;
            println!("{}", render_summary(&summary));
            Ok(())
        }
        Commands::Status => {
            let reachable = ctl.probe().await;
            println!(
                "{} ({})",
                if reachable { "connected" } else { "unreachable" },
                ctl.api().base()
            );
            println!("Active session: {}", ctl.view().session_id());
            if reachable {
                Ok(())
            } else {
                bail!("Server is not reachable")
            }
        }
    }
}

async fn send(ctl: &mut Controller, message: &str) -> Result<()> {
    if message.trim().is_empty() {
        bail!("Message is required for send command");
    }
    let applied = ctl.send_message(message).await;
    print_transcript(ctl)?;
    match applied {
        Some(applied) => exit_status(applied),
        None => bail!("Message not sent"),
    }
}

async fn new_session(ctl: &mut Controller, yes: bool) -> Result<()> {
    // The transcript only knows about conversation once history is loaded.
    if !yes {
        ctl.reload().await;
    }

    if ctl.start_new_session(yes) == NewSession::NeedsConfirmation {
        if !confirm("Starting a new conversation will clear the current one. Continue?")? {
            println!("Cancelled.");
            return Ok(());
        }
        ctl.start_new_session(true);
    }

    println!("New session: {}", ctl.view().session_id());
    Ok(())
}

async fn delete(ctl: &mut Controller, id: &str, yes: bool) -> Result<()> {
    if !yes {
        ctl.list_sessions().await;
        let what = describe_session(id, ctl.view().sessions());
        if !confirm(&format!("Delete session {what}?"))? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let applied = ctl.delete_session(id).await;
    print_transcript(ctl)?;
    exit_status(applied)
}

fn print_transcript(ctl: &Controller) -> Result<()> {
    let mut stdout = io::stdout().lock();
    Renderer::new()
        .flush(ctl.view(), &mut stdout)
        .context("Failed to write transcript")
}

fn exit_status(applied: Applied) -> Result<()> {
    match applied {
        Applied::Success | Applied::Stale => Ok(()),
        Applied::Failed => bail!("Request failed"),
    }
}

/// Ask a yes/no question on the terminal. Anything but `y`/`yes` is a no.
pub fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(is_yes(&answer))
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
