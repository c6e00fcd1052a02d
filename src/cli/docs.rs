use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::OutputConfig;
use crate::config::Config;
use crate::docs::DocGenerator;

#[derive(Args)]
pub struct DocsArgs {
    /// Directory of Go sources to document
    path: PathBuf,

    /// Where to write the Markdown pages
    #[arg(long, short = 'o', default_value = "docs")]
    output: PathBuf,
}

#[derive(Serialize)]
struct DocsOutput {
    functions: usize,
    files: Vec<PathBuf>,
}

pub fn run(args: DocsArgs, config: &Config, output: OutputConfig) -> Result<()> {
    let chunks = super::extract::extract_dir(&args.path, config, output)?;
    let files = DocGenerator::new(&args.output).generate(&chunks)?;

    if output.json {
        let out = DocsOutput {
            functions: chunks.len(),
            files,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !output.quiet {
        println!(
            "{} Documented {} functions in {}",
            "✓".green(),
            chunks.len(),
            args.output.display().to_string().cyan()
        );
    }

    Ok(())
}
