//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Deskbot - terminal client for the AI desktop robot chat server
#[derive(Parser, Debug)]
#[command(name = "deskbot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the chat API (overrides DESKBOT_SERVER)
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Adopt this session id as the active session
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Subcommand to execute (defaults to the interactive chat)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat in the active session
    Chat,

    /// Send one message to the active session and print the reply
    Send {
        /// Message to send
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
    },

    /// List sessions
    Sessions {
        /// Only show sessions whose row contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show the history of a session (defaults to the active one)
    History {
        /// Session ID to show
        id: Option<String>,
    },

    /// Make a session active and show its history
    Switch {
        /// Session ID to switch to
        id: String,
    },

    /// Start a new session
    New {
        /// Discard the current conversation without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete a session
    Delete {
        /// Session ID to delete
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete several sessions at once
    DeleteMany {
        /// Session IDs to delete
        #[arg(required = true)]
        ids: Vec<String>,

        /// Confirmation phrase (CONFIRM_DELETE)
        #[arg(long)]
        confirm: String,
    },

    /// Delete all sessions, or all but the most recent ones
    Clear {
        /// Keep this many of the most recent sessions
        #[arg(long)]
        keep_latest: Option<u32>,

        /// Confirmation phrase (CONFIRM_DELETE)
        #[arg(long)]
        confirm: String,
    },

    /// Show a summary of a session (defaults to the active one)
    Summary {
        /// Session ID to summarize
        id: Option<String>,
    },

    /// Check whether the server is reachable
    Status,
}
