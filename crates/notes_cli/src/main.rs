//! Command-line host for note packages.
//!
//! # Responsibility
//! - Drive `notes_core` document operations from a shell.
//! - Render core errors with context; never mutate packages directly.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use notes_core::{init_logging, DocumentError, NoteDocument, RichText};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "notes")]
#[command(about = "Create and inspect rich-text note packages")]
#[command(version)]
struct Cli {
    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "NOTES_LOG_LEVEL", default_value_t = notes_core::default_log_level().to_string())]
    log_level: String,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "NOTES_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new note package
    New {
        path: PathBuf,
        /// Initial plain-text body
        #[arg(long, default_value = "")]
        text: String,
    },
    /// Print the body and attachments of a package
    Show {
        path: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Copy a file or directory into the package's attachments
    Attach { path: PathBuf, file: PathBuf },
    /// Remove an attachment by name
    Detach { path: PathBuf, name: String },
    /// Replace the body with plain text
    SetText { path: PathBuf, text: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(&cli.log_level, log_dir)
            .map_err(anyhow::Error::msg)
            .context("failed to initialize logging")?;
    }

    match cli.command {
        Commands::New { path, text } => {
            if path.exists() {
                anyhow::bail!("{} already exists", path.display());
            }
            let mut document = NoteDocument::new();
            if !text.is_empty() {
                document.set_text(RichText::plain(text));
            }
            save(&mut document, &path)?;
            info!("event=cli_new module=cli status=ok");
        }
        Commands::Show { path, json } => {
            let document = open(&path)?;
            if json {
                let value = serde_json::json!({
                    "text": document.text().to_plain_string(),
                    "runs": document.text(),
                    "attachments": document.attached_files().unwrap_or_default(),
                    "summary": document.summary().map(|summary| summary.attachments),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", document.text().to_plain_string());
                match document.attached_files() {
                    None => println!("(no attachments)"),
                    Some(files) => {
                        for file in files {
                            println!("- {} ({:?}, {} bytes)", file.name, file.kind, file.size);
                        }
                    }
                }
            }
        }
        Commands::Attach { path, file } => {
            let mut document = open(&path)?;
            document
                .add_attachment(&file)
                .map_err(describe)
                .with_context(|| format!("failed to attach {}", file.display()))?;
            save(&mut document, &path)?;
        }
        Commands::Detach { path, name } => {
            let mut document = open(&path)?;
            let removed = document.remove_attachment(&name).map_err(describe)?;
            if !removed {
                anyhow::bail!("no attachment named `{name}`");
            }
            save(&mut document, &path)?;
        }
        Commands::SetText { path, text } => {
            let mut document = open(&path)?;
            document.set_text(RichText::plain(text));
            save(&mut document, &path)?;
        }
    }

    Ok(())
}

fn open(path: &Path) -> Result<NoteDocument> {
    NoteDocument::open(path)
        .map_err(describe)
        .with_context(|| format!("failed to open {}", path.display()))
}

fn save(document: &mut NoteDocument, path: &Path) -> Result<()> {
    document
        .save_to(path)
        .map_err(describe)
        .with_context(|| format!("failed to save {}", path.display()))
}

/// Prefixes coded errors with their domain code for support reports.
fn describe(err: DocumentError) -> anyhow::Error {
    match err.code() {
        Some(code) => {
            let message = format!("{} ({} {})", err, notes_core::ERROR_DOMAIN, code.as_i32());
            anyhow::Error::new(err).context(message)
        }
        None => anyhow::Error::new(err),
    }
}
