use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::OutputConfig;
use crate::config::Config;
use crate::types::IngestSummary;

#[derive(Args)]
pub struct IngestArgs {
    /// Local directory or GitHub URL (https://github.com/... or git@github.com:...)
    source: String,

    /// Drop previously ingested chunks before ingesting
    #[arg(long)]
    fresh: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestOutput<'a> {
    source: &'a str,
    #[serde(flatten)]
    summary: IngestSummary,
    elapsed_ms: u64,
}

pub async fn run(args: IngestArgs, config: &Config, output: OutputConfig) -> Result<()> {
    let mut assistant = super::open_assistant(config).await?;
    let cancel = super::cancel_on_ctrl_c();

    if args.fresh {
        assistant
            .reset()
            .await
            .with_context(|| format!("Failed to reset {}", config.storage.path.display()))?;
        tracing::info!(path = %config.storage.path.display(), "dropped stored chunks");
    }

    let start = std::time::Instant::now();
    let spinner = output.spinner(format!("Ingesting {}", args.source));
    let result = assistant.ingest(&args.source, &cancel).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let summary = result.with_context(|| format!("Failed to ingest {}", args.source))?;
    let elapsed = start.elapsed();

    if output.json {
        let out = IngestOutput {
            source: &args.source,
            summary,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !output.quiet {
        println!(
            "{} Ingested {}: {} chunks from {} files in {:.1}s",
            "✓".green(),
            args.source.cyan(),
            summary.chunks_stored.to_string().bold(),
            summary.files_processed,
            elapsed.as_secs_f64()
        );
        if summary.skipped_files > 0 {
            println!(
                "{} {} files skipped (parse errors; rerun with --verbose for details)",
                "!".yellow(),
                summary.skipped_files
            );
        }
    }

    Ok(())
}
