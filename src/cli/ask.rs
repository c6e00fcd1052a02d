use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::OutputConfig;
use crate::config::Config;

#[derive(Args)]
pub struct AskArgs {
    /// The question to answer
    question: String,

    /// Maximum number of code chunks to ground the answer in
    #[arg(long, short = 'n')]
    top_k: Option<usize>,

    /// Minimum cosine similarity for a chunk to count as relevant
    #[arg(long)]
    threshold: Option<f32>,
}

pub async fn run(args: AskArgs, config: &Config, output: OutputConfig) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let mut params = config.search;
    if let Some(top_k) = args.top_k {
        params.top_k = top_k;
    }
    if let Some(threshold) = args.threshold {
        params.threshold = threshold;
    }

    let assistant = super::open_assistant(config).await?;
    let cancel = super::cancel_on_ctrl_c();

    let spinner = output.spinner("Thinking".to_string());
    let result = assistant.ask_with(question, &params, &cancel).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let answer = result.context("Failed to answer question")?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.answer);
    if output.quiet {
        return Ok(());
    }

    println!();
    println!("{}", "Sources:".bold());
    for (i, source) in answer.sources.iter().enumerate() {
        let chunk = &source.chunk;
        println!(
            "{}. {}:{}-{} {} {}",
            (i + 1).to_string().bold(),
            chunk.file_path.blue(),
            chunk.start_line,
            chunk.end_line,
            chunk.signature().cyan(),
            format!("({:.2})", source.similarity).dimmed()
        );
        if output.verbose && !chunk.description.is_empty() {
            for line in chunk.description.lines() {
                println!("   {}", line.dimmed());
            }
        }
    }

    Ok(())
}
