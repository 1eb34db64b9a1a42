//! CLI module - argument parsing and subcommand runners

mod args;
pub mod commands;

pub use args::{Cli, Commands};
pub use commands::*;
