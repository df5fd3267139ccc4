//! CLI argument parsing, command execution and the interactive loop.

mod args;
mod commands;
mod controller;
mod repl;

pub use args::Cli;
pub use commands::execute;
