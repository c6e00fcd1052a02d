use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use super::OutputConfig;
use crate::config::Config;
use crate::index::{GoExtractor, SourceExtractor, SourceWalker};
use crate::types::CodeChunk;

#[derive(Args)]
pub struct ExtractArgs {
    /// Go source file or directory
    path: PathBuf,
}

pub fn run(args: ExtractArgs, config: &Config, output: OutputConfig) -> Result<()> {
    let chunks = if args.path.is_dir() {
        extract_dir(&args.path, config, output)?
    } else {
        let mut extractor = GoExtractor::new()?;
        extractor
            .extract(&args.path)
            .with_context(|| format!("Failed to extract {}", args.path.display()))?
    };

    if output.json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
    } else if !output.quiet {
        print_human(&chunks, output.verbose);
    }

    Ok(())
}

/// Collect chunks from every accepted file, reporting parse failures on stderr
pub(super) fn extract_dir(root: &Path, config: &Config, output: OutputConfig) -> Result<Vec<CodeChunk>> {
    let walker = SourceWalker::new(root, GoExtractor::new()?, config.index.use_gitignore)?;
    let mut chunks = Vec::new();

    for (path, result) in walker {
        match result {
            Ok(found) => chunks.extend(found),
            Err(err) => {
                if !output.quiet {
                    eprintln!("{} skipped {}: {}", "!".yellow(), path.display(), err);
                }
            }
        }
    }

    Ok(chunks)
}

fn print_human(chunks: &[CodeChunk], verbose: bool) {
    if chunks.is_empty() {
        println!("{} No functions found", "!".yellow());
        return;
    }

    println!("{} Found {} functions", "✓".green(), chunks.len());
    println!();
    for chunk in chunks {
        println!(
            "{}:{}-{} {}",
            chunk.file_path.blue(),
            chunk.start_line,
            chunk.end_line,
            chunk.signature().cyan()
        );
        if !chunk.description.is_empty() {
            let mut lines = chunk.description.lines();
            if verbose {
                for line in lines {
                    println!("   {}", line.dimmed());
                }
            } else if let Some(first) = lines.next() {
                println!("   {}", first.dimmed());
            }
        }
    }
}
