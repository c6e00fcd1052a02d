use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use super::OutputConfig;
use crate::config::Config;
use crate::storage::{ChunkStore, EmbeddingCache};

#[derive(Args)]
pub struct ResetArgs {
    /// Confirm deletion of every stored chunk
    #[arg(long)]
    yes: bool,

    /// Also clear the embedding cache
    #[arg(long)]
    cache: bool,
}

pub async fn run(args: ResetArgs, config: &Config, output: OutputConfig) -> Result<()> {
    if !args.yes {
        bail!(
            "Refusing to delete all chunks in {} without --yes",
            config.storage.path.display()
        );
    }

    ChunkStore::reset_at(&config.storage)
        .await
        .with_context(|| format!("Failed to reset {}", config.storage.path.display()))?;

    let cache_path = config.storage.cache_path();
    let mut cache_entries = 0;
    if args.cache && cache_path.exists() {
        let cache = EmbeddingCache::open(&cache_path)?;
        cache_entries = cache.len()?;
        cache.clear()?;
    }

    if output.json {
        println!(
            "{}",
            serde_json::json!({
                "reset": true,
                "path": config.storage.path,
                "cacheEntriesCleared": cache_entries,
            })
        );
    } else if !output.quiet {
        println!(
            "{} Reset {}",
            "✓".green(),
            config.storage.path.display().to_string().cyan()
        );
        if cache_entries > 0 {
            println!("{} Cleared {} cached embeddings", "✓".green(), cache_entries);
        }
    }

    Ok(())
}
