//! Chat Archive - import, merge and export chat conversation history.
//!
//! Reads any of the four historical export formats, migrates it to the
//! current one and merges it into a local JSON store or a SQLite database
//! without duplicating identifiers.
//!
//! QUICK START:
//!   chat-archive init                     # Write ~/.chat-archive/config.toml
//!   chat-archive import backup.json       # Merge an export into storage
//!   chat-archive list                     # See stored conversations
//!   chat-archive export                   # Write chatbot_ui_export_<date>_data.json
//!   chat-archive export-markdown          # Write chatbot_ui_export_<date>_markdown.zip

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    clear_conversations, format_conversations_json, format_conversations_table,
    format_import_summary, format_status, import_data, write_data_export, write_markdown_export,
    ImportOptions, OutputFormat, StoreSummary, SupportedExport,
};
use cli::{Cli, Commands, StorageCommand};
use domain::{
    AppConfig, BackendKind, ChatStore, SelectionStore, SessionProvider, SignInRequest,
    StorageContext,
};
use infrastructure::{
    ensure_config_exists, load_config, load_config_from_file, FileSessionStore, LocalStorage,
    SqliteStorage,
};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli
        .output_format()
        .map_err(|message| domain::AppError::Config { message })?;
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Init => cmd_init(&config),
        Commands::Storage(command) => run_with_storage(command, &config, format),
    }
}

/// Runs a command that needs the storage backend.
fn run_with_storage(
    command: StorageCommand,
    config: &AppConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let mut selection = LocalStorage::open(&config.local_storage_path());

    match command {
        StorageCommand::Import { file } => {
            let mut ctx = StorageContext::new(store.as_mut(), &mut selection);
            cmd_import(&mut ctx, &file, config)?;
        }
        StorageCommand::Export { dir } => {
            let dir = dir.unwrap_or_else(|| config.exports_dir());
            let path = write_data_export(store.as_ref(), &dir, today())?;
            println!("{} Exported data to {}", "✓".green().bold(), path.display());
        }
        StorageCommand::ExportMarkdown { dir } => {
            let dir = dir.unwrap_or_else(|| config.exports_dir());
            let path = write_markdown_export(store.as_ref(), &dir, today())?;
            println!(
                "{} Exported Markdown archive to {}",
                "✓".green().bold(),
                path.display()
            );
        }
        StorageCommand::List { limit } => {
            cmd_list(store.as_ref(), limit, format)?;
        }
        StorageCommand::Status => {
            cmd_status(store.as_ref(), &selection, config, format)?;
        }
        StorageCommand::Clear => {
            let mut ctx = StorageContext::new(store.as_mut(), &mut selection);
            clear_conversations(&mut ctx)?;
            println!("{} Cleared conversations", "✓".green().bold());
        }
        StorageCommand::Login { email, provider } => {
            require_auth(config)?;
            let mut sessions = FileSessionStore::new(&config.session_path());
            let session = sessions.sign_in(SignInRequest {
                user: email,
                provider,
            })?;
            println!(
                "{} Signed in as {} ({})",
                "✓".green().bold(),
                session.user.cyan(),
                session.provider
            );
        }
        StorageCommand::Logout => {
            require_auth(config)?;
            FileSessionStore::new(&config.session_path()).sign_out()?;
            println!("{} Signed out", "✓".green().bold());
        }
    }

    Ok(())
}

/// Loads the config file and applies command-line overrides.
fn resolve_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.data_dir {
        Some(dir) => {
            let path = dir.join("config.toml");
            if path.exists() {
                load_config_from_file(&path)?
            } else {
                AppConfig::default()
            }
        }
        None => load_config()?,
    };

    if let Some(dir) = &cli.data_dir {
        config.paths.data_dir = Some(dir.clone());
    }
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }

    tracing::debug!(
        backend = %config.storage.backend,
        data_dir = %config.data_dir().display(),
        "Configuration resolved"
    );

    Ok(config)
}

/// Opens the configured backend.
fn open_store(config: &AppConfig) -> anyhow::Result<Box<dyn ChatStore>> {
    Ok(match config.storage.backend {
        BackendKind::Local => Box::new(LocalStorage::open(&config.local_storage_path())),
        BackendKind::Relational => Box::new(
            SqliteStorage::open(&config.database_path()).with_context(|| {
                format!("Failed to open {}", config.database_path().display())
            })?,
        ),
    })
}

/// Write the default config file.
fn cmd_init(config: &AppConfig) -> anyhow::Result<()> {
    let path = config.config_file_path();
    if ensure_config_exists(&path)? {
        println!("{} Created {}", "✓".green().bold(), path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}

/// Import command.
fn cmd_import(
    ctx: &mut StorageContext<'_>,
    file: &str,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let text = read_input(file)?;
    let data = SupportedExport::from_json(&text).with_context(|| format!("Cannot import {file}"))?;
    let options = ImportOptions {
        persist_merged_prompts: config.import.persist_merged_prompts,
    };

    let merged = import_data(ctx, data, options)?;
    println!("{}", format_import_summary(&merged));
    Ok(())
}

/// List conversations command.
fn cmd_list(store: &dyn ChatStore, limit: usize, format: OutputFormat) -> anyhow::Result<()> {
    let mut conversations = store.conversations()?;
    if limit > 0 {
        conversations.truncate(limit);
    }

    match format {
        OutputFormat::Table => {
            let folders = store.folders()?;
            println!("{}", format_conversations_table(&conversations, &folders));
        }
        OutputFormat::Json => {
            println!("{}", format_conversations_json(&conversations)?);
        }
    }

    Ok(())
}

/// Status command.
fn cmd_status(
    store: &dyn ChatStore,
    selection: &dyn SelectionStore,
    config: &AppConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let session = if config.auth.enabled {
        FileSessionStore::new(&config.session_path()).current_session()?
    } else {
        None
    };
    let summary = StoreSummary::collect(store, selection, session)?;

    match format {
        OutputFormat::Table => println!("{}", format_status(&summary, config.auth.enabled)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

fn require_auth(config: &AppConfig) -> anyhow::Result<()> {
    if !config.auth.enabled {
        bail!(domain::AppError::Config {
            message: "authentication is disabled (set auth.enabled = true)".into(),
        });
    }
    Ok(())
}

/// Reads the import source: a file path or "-" for stdin.
fn read_input(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(Path::new(file)).with_context(|| format!("Failed to read {file}"))
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
