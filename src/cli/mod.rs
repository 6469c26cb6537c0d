//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;
use crate::domain::{AuthProvider, BackendKind};

/// Chat Archive - import, merge and export chat history.
///
/// Accepts every historical export format and writes the current one.
#[derive(Parser, Debug)]
#[command(name = "chat-archive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: table or json.
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Storage backend: local or relational (overrides the config file).
    #[arg(short, long, global = true)]
    pub backend: Option<BackendKind>,

    /// Data directory (overrides the config file).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file.
    Init,

    #[command(flatten)]
    Storage(StorageCommand),
}

/// Commands that operate on the configured storage backend.
#[derive(Subcommand, Debug)]
pub enum StorageCommand {
    /// Import an export file (any version) and merge it into storage.
    Import {
        /// Path to the JSON export, or "-" for stdin.
        file: String,
    },

    /// Export all data as a canonical JSON file.
    Export {
        /// Output directory (defaults to the exports directory).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Export conversations as a ZIP archive of Markdown files.
    ExportMarkdown {
        /// Output directory (defaults to the exports directory).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// List stored conversations.
    List {
        /// Maximum number of conversations to show (0 = all).
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show storage counts, selected conversation and session.
    Status,

    /// Delete all conversations and chat folders.
    Clear,

    /// Sign in.
    Login {
        /// Email address of the user.
        #[arg(short, long)]
        email: String,

        /// Identity provider: credentials or google.
        #[arg(short, long, default_value = "credentials")]
        provider: AuthProvider,
    },

    /// Sign out.
    Logout,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}
