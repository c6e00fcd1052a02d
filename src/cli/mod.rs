mod ask;
mod completions;
mod docs;
mod extract;
mod ingest;
mod reset;
mod serve;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::index::{CachedEmbedder, GeminiClient, SharedEmbedder};
use crate::storage::{ChunkStore, EmbeddingCache};

#[derive(Parser)]
#[command(name = "codescribe")]
#[command(about = "Ask questions about a Go codebase, answered from its own functions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Show detailed progress
    #[arg(long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "CODESCRIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the vector store and embedding cache
    #[arg(long, global = true, env = "CODESCRIBE_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, embed and store the functions of a directory or GitHub repository
    Ingest(ingest::IngestArgs),

    /// Answer a question from the ingested code
    Ask(ask::AskArgs),

    /// Print the functions extracted from a file or directory
    Extract(extract::ExtractArgs),

    /// Generate Markdown reference pages for a directory
    Docs(docs::DocsArgs),

    /// Start the HTTP server
    Serve(serve::ServeArgs),

    /// Delete every stored chunk
    Reset(reset::ResetArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

impl Cli {
    /// Default tracing filter implied by `--quiet` and `--verbose`
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet || self.json {
            "warn"
        } else {
            "info"
        }
    }

    pub async fn run(self) -> Result<()> {
        let output = OutputConfig {
            json: self.json,
            quiet: self.quiet,
            verbose: self.verbose,
        };

        let Cli {
            command,
            config,
            data_dir,
            ..
        } = self;
        let load = || load_config(config.as_deref(), data_dir.as_deref());

        match command {
            Commands::Ingest(args) => ingest::run(args, &load()?, output).await,
            Commands::Ask(args) => ask::run(args, &load()?, output).await,
            Commands::Extract(args) => extract::run(args, &load()?, output),
            Commands::Docs(args) => docs::run(args, &load()?, output),
            Commands::Serve(args) => serve::run(args, load()?, output).await,
            Commands::Reset(args) => reset::run(args, &load()?, output).await,
            Commands::Completions(args) => {
                completions::run(args);
                Ok(())
            }
        }
    }
}

/// Resolve the config file and apply `--data-dir`
fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> Result<Config> {
    let config = Config::resolve(path)?;
    Ok(match data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

/// Output configuration passed to all commands
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

impl OutputConfig {
    /// Spinner for long-running steps; hidden for JSON and quiet output
    pub fn spinner(&self, message: String) -> Option<ProgressBar> {
        if self.json || self.quiet {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

/// Token cancelled when the process receives Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            trigger.cancel();
        }
    });
    token
}

/// Gemini-backed embedder, wrapped in the SQLite cache when enabled
fn open_embedder(config: &Config, client: &Arc<GeminiClient>) -> Result<SharedEmbedder> {
    if !config.storage.embedding_cache {
        return Ok(client.clone());
    }
    let cache_path = config.storage.cache_path();
    let cache = EmbeddingCache::open(&cache_path)
        .with_context(|| format!("Failed to open embedding cache: {}", cache_path.display()))?;
    Ok(Arc::new(CachedEmbedder::new(client.clone(), cache)))
}

/// Open the store and providers for commands that talk to the model
pub async fn open_assistant(config: &Config) -> Result<Assistant> {
    let client = Arc::new(
        GeminiClient::new(&config.provider).context("Failed to create Gemini client")?,
    );
    let embedder = open_embedder(config, &client)?;
    let store = ChunkStore::open(&config.storage, embedder)
        .await
        .with_context(|| format!("Failed to open vector store: {}", config.storage.path.display()))?;
    Ok(Assistant::new(store, client, config))
}
