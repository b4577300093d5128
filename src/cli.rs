use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::ClientConfig;
use crate::roles::DEFAULT_ROLES;

#[derive(Parser, Debug)]
#[command(name = "roundtable")]
#[command(version)]
#[command(about = "Ask a panel of AI roles a question and follow the moderated discussion")]
pub struct Args {
    /// TOML config file (defaults to ./roundtable.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API root, e.g. http://localhost:8080/api
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List chat rooms
    Rooms,

    /// Create an empty chat room
    Create {
        #[arg(long)]
        title: Option<String>,
    },

    /// Show room details and statistics
    Show { id: u64 },

    /// Print a room's history
    History {
        id: u64,
        /// Print moderator entries as stored instead of decoding them
        #[arg(long)]
        raw: bool,
    },

    /// Send a question to the selected roles
    Ask {
        question: String,
        /// Existing room; a new one is created when omitted
        #[arg(long)]
        room: Option<u64>,
        /// Comma-separated role keys
        #[arg(long, default_value_t = DEFAULT_ROLES.join(","))]
        roles: String,
        /// Discussion rounds (1..=5)
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        /// Return as soon as the server accepts the question
        #[arg(long)]
        no_wait: bool,
    },

    /// Print a room's note, or replace it when TEXT is given
    Note { id: u64, text: Option<String> },

    /// Rename a room
    Title { id: u64, text: String },

    /// Delete a room
    Delete { id: u64 },

    /// Ask the summarizer for a summary of a room
    Summarize { id: u64 },

    /// Render a moderator payload (reads stdin when TEXT is omitted)
    Decode { text: Option<String> },

    /// Print shell completions
    Completions { shell: Shell },
}

impl Args {
    /// Apply the flag overrides on top of `config`.
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(url) = self.base_url.as_ref().filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            config.token = Some(token.clone());
        }
    }
}
