//! Command-line interface for fauxpost.
//!
//! Provides commands for authoring and opening share links, rendering
//! text, and managing saved records and the enable toggle.

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::JsonFileStore;
use crate::config;
use crate::core::{Opened, Session};

/// fauxpost - Rewrite short posts and share them through self-contained links
#[derive(Parser, Debug)]
#[command(name = "fauxpost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Record store file (overrides config)
    #[arg(long, global = true, env = "FAUXPOST_STORE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a share link for rewritten text and save it
    Author {
        /// Content identifier (e.g. urn:li:activity:123)
        identifier: String,

        /// File with the rewritten text (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// File with the original post text
        #[arg(long)]
        original: Option<PathBuf>,

        /// Also print the outer key
        #[arg(long)]
        show_key: bool,

        /// Also print the rendered markup
        #[arg(long)]
        preview: bool,
    },

    /// Consume a share link or decoded-data URL
    Open {
        /// URL as opened in the browser
        url: String,

        /// File with the original post text shown on the page
        #[arg(long)]
        original: Option<PathBuf>,
    },

    /// Render text to markup
    Render {
        /// Input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List saved records with their share URLs
    List,

    /// Show one saved record
    Show {
        /// Content identifier
        identifier: String,
    },

    /// Delete saved records
    Delete {
        /// Identifiers to delete
        #[arg(required_unless_present = "all")]
        identifiers: Vec<String>,

        /// Delete every record
        #[arg(long, conflicts_with = "identifiers")]
        all: bool,
    },

    /// Turn FauxPost on
    Enable,

    /// Turn FauxPost off
    Disable,

    /// Show whether FauxPost is on
    Status,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let store = self.store;

        match self.command {
            Commands::Author {
                identifier,
                input,
                original,
                show_key,
                preview,
            } => author(store, &identifier, input, original, show_key, preview).await,
            Commands::Open { url, original } => open(store, &url, original).await,
            Commands::Render { input } => render(store, input).await,
            Commands::List => list(store).await,
            Commands::Show { identifier } => show(store, &identifier).await,
            Commands::Delete { identifiers, all } => delete(store, identifiers, all).await,
            Commands::Enable => toggle(store, true).await,
            Commands::Disable => toggle(store, false).await,
            Commands::Status => status(store).await,
            Commands::Config => show_config(store),
        }
    }
}

/// Open the configured store and start a session on it
async fn start_session(store_override: Option<PathBuf>) -> Result<Session> {
    let cfg = config::config()?;
    let path = store_override.unwrap_or_else(|| cfg.store.clone());

    let backend = JsonFileStore::open(&path)
        .await
        .with_context(|| format!("Failed to open store: {}", path.display()))?;

    Session::start(Arc::new(backend), cfg.session_settings())
        .await
        .context("Failed to start session")
}

/// Read text from a file, or from stdin when no file is given
fn read_text(path: Option<PathBuf>) -> Result<String> {
    if let Some(path) = path {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(buffer)
}

fn read_optional(path: Option<PathBuf>) -> Result<Option<String>> {
    path.map(|p| {
        std::fs::read_to_string(&p)
            .map(|text| text.trim().to_string())
            .with_context(|| format!("Failed to read file: {}", p.display()))
    })
    .transpose()
}

/// Build and save a share link
async fn author(
    store: Option<PathBuf>,
    identifier: &str,
    input: Option<PathBuf>,
    original: Option<PathBuf>,
    show_key: bool,
    preview: bool,
) -> Result<()> {
    let text = read_text(input)?;
    if text.trim().is_empty() {
        anyhow::bail!("No rewritten text provided. Use --input <file> or pipe to stdin");
    }
    let original = read_optional(original)?;

    let session = start_session(store).await?;
    let link = session
        .author(identifier, original.as_deref(), &text)
        .await
        .with_context(|| format!("Failed to author link for {}", identifier))?;

    println!("{}", link.target_url);
    if show_key {
        eprintln!("Key: {}", link.outer_key);
    }
    if preview {
        eprintln!("\n{}", session.preview(&text));
    }

    session.stop();
    Ok(())
}

/// Consume an opened URL
async fn open(store: Option<PathBuf>, url: &str, original: Option<PathBuf>) -> Result<()> {
    let original = read_optional(original)?;
    let session = start_session(store).await?;

    let opened = session
        .open(url, original.as_deref())
        .await
        .context("Could not decode FauxPost link")?;

    match opened {
        Opened::Ignored => {
            if session.is_enabled() {
                println!("Nothing to do: URL carries no FauxPost data");
            } else {
                println!("FauxPost is disabled. Use 'fauxpost enable' to turn it on.");
            }
        }
        Opened::Redirected {
            identifier,
            inner_url,
            markup,
            saved,
            ..
        } => {
            eprintln!("Identifier: {}", identifier.as_deref().unwrap_or("(none)"));
            eprintln!("Saved: {}", saved);
            eprintln!("Redirect: {}", inner_url);
            println!("{}", markup);
        }
        Opened::Decoded {
            identifier,
            markup,
            saved,
            ..
        } => {
            eprintln!("Identifier: {}", identifier.as_deref().unwrap_or("(none)"));
            eprintln!("Saved: {}", saved);
            println!("{}", markup);
        }
    }

    session.stop();
    Ok(())
}

/// Render text to markup
async fn render(store: Option<PathBuf>, input: Option<PathBuf>) -> Result<()> {
    let text = read_text(input)?;
    let session = start_session(store).await?;
    println!("{}", session.preview(&text));
    session.stop();
    Ok(())
}

/// List saved records
async fn list(store: Option<PathBuf>) -> Result<()> {
    let session = start_session(store).await?;
    let records = session.records().get_all().await?;

    let count = records.len();
    println!(
        "{} saved record{}",
        count,
        if count == 1 { "" } else { "s" }
    );

    if records.is_empty() {
        session.stop();
        return Ok(());
    }

    println!("{}", "-".repeat(80));
    for (index, (identifier, record)) in records.iter().enumerate() {
        let url = session
            .share_url(record)
            .unwrap_or_else(|| "(missing key)".to_string());
        println!("{:>3}. {}", index + 1, identifier);
        println!("     {}", url);
    }

    session.stop();
    Ok(())
}

/// Show one record
async fn show(store: Option<PathBuf>, identifier: &str) -> Result<()> {
    let session = start_session(store).await?;
    let record = session.records().get_one(identifier).await?;

    if record.is_empty() {
        anyhow::bail!("No record for: {}", identifier);
    }

    println!("Identifier: {}", identifier);
    println!(
        "Share URL:  {}",
        session
            .share_url(&record)
            .unwrap_or_else(|| "(missing key)".to_string())
    );
    if let Some(fingerprint) = record.original_fingerprint() {
        println!("Original SHA-256: {}", fingerprint);
    }
    println!("\nOriginal:\n{}", record.original.as_deref().unwrap_or("(none)"));
    println!("\nFauxPost:\n{}", record.decoded.as_deref().unwrap_or("(none)"));

    session.stop();
    Ok(())
}

/// Delete records
async fn delete(store: Option<PathBuf>, identifiers: Vec<String>, all: bool) -> Result<()> {
    let session = start_session(store).await?;

    if all {
        let removed = session.records().remove_all().await?;
        println!("Deleted {} record{}", removed, if removed == 1 { "" } else { "s" });
    } else {
        session.records().remove(&identifiers).await?;
        println!("Deleted: {}", identifiers.join(", "));
    }

    let remaining = session.records().count().await?;
    println!("{} saved record{}", remaining, if remaining == 1 { "" } else { "s" });

    session.stop();
    Ok(())
}

/// Persist the enable toggle
async fn toggle(store: Option<PathBuf>, enabled: bool) -> Result<()> {
    let mut session = start_session(store).await?;
    session.set_enabled(enabled).await?;
    println!("FauxPost {}", if enabled { "enabled" } else { "disabled" });
    session.stop();
    Ok(())
}

/// Print the enable toggle
async fn status(store: Option<PathBuf>) -> Result<()> {
    let session = start_session(store).await?;
    let count = session.records().count().await?;

    println!(
        "FauxPost is {}",
        if session.is_enabled() { "enabled" } else { "disabled" }
    );
    println!("{} saved record{}", count, if count == 1 { "" } else { "s" });

    session.stop();
    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config(store_override: Option<PathBuf>) -> Result<()> {
    let cfg = config::config()?;

    println!("FauxPost Configuration");
    println!("{}", "=".repeat(60));
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:  {}", cfg.home.display());
    println!(
        "  Store: {}",
        store_override.as_ref().unwrap_or(&cfg.store).display()
    );
    println!();
    println!("Links:");
    println!("  Share base:     {}", cfg.links.share_base);
    println!("  Content base:   {}", cfg.links.content_base);
    println!("  Hashtag search: {}", cfg.links.hashtag_search);
    println!();
    println!("Enabled by default: {}", cfg.enabled_by_default);

    Ok(())
}
