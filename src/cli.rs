//! Command line interface.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "remontnik", version, about = "Telegram bot for hotel maintenance requests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot (default when no subcommand is given)
    Run,
    /// Validate configuration and credentials, then exit
    CheckConfig,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
