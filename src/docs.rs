//! Markdown reference pages for extracted functions.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::types::CodeChunk;

/// Writes one page per function plus an `index.md` into a directory
pub struct DocGenerator {
    output_dir: PathBuf,
}

impl DocGenerator {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Render and write every page, returning the paths written (index last)
    pub fn generate(&self, chunks: &[CodeChunk]) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.output_dir.display())
        })?;

        let names = page_names(chunks);
        let mut written = Vec::with_capacity(chunks.len() + 1);

        for (chunk, name) in chunks.iter().zip(&names) {
            let path = self.output_dir.join(format!("{name}.md"));
            std::fs::write(&path, render_function(chunk))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }

        let index = self.output_dir.join("index.md");
        std::fs::write(&index, render_index(chunks, &names))
            .with_context(|| format!("Failed to write {}", index.display()))?;
        written.push(index);

        tracing::info!(pages = chunks.len(), dir = %self.output_dir.display(), "wrote documentation");
        Ok(written)
    }
}

/// File stem for each chunk's page; repeated names get `-2`, `-3`, ...
pub fn page_names(chunks: &[CodeChunk]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    chunks
        .iter()
        .map(|chunk| {
            let n = seen.entry(chunk.name.as_str()).or_insert(0);
            *n += 1;
            if *n == 1 {
                chunk.name.clone()
            } else {
                format!("{}-{}", chunk.name, n)
            }
        })
        .collect()
}

/// Markdown page for a single function
pub fn render_function(chunk: &CodeChunk) -> String {
    let mut out = format!("# {}\n\n```go\nfunc {}\n```\n\n", chunk.name, chunk.signature());

    if !chunk.description.is_empty() {
        out.push_str(&chunk.description);
        out.push_str("\n\n");
    }

    let _ = writeln!(
        out,
        "**Defined in:** `{}` (lines {}-{})",
        chunk.file_path, chunk.start_line, chunk.end_line
    );

    if !chunk.parameters.is_empty() {
        out.push_str("\n## Parameters\n\n| Name | Type |\n|------|------|\n");
        for p in &chunk.parameters {
            let name = if p.name.is_empty() { "_" } else { p.name.as_str() };
            let _ = writeln!(out, "| {name} | `{}` |", p.type_name);
        }
    }

    if !chunk.returns.is_empty() {
        out.push_str("\n## Returns\n\n");
        for r in &chunk.returns {
            let _ = writeln!(out, "- `{r}`");
        }
    }

    out
}

/// Table of every function linking to its page
pub fn render_index(chunks: &[CodeChunk], page_names: &[String]) -> String {
    let mut out = String::from("# Function Reference\n\n");
    if chunks.is_empty() {
        out.push_str("No functions found.\n");
        return out;
    }

    out.push_str("| Function | File | Lines |\n|----------|------|-------|\n");
    for (chunk, page) in chunks.iter().zip(page_names) {
        let _ = writeln!(
            out,
            "| [{}]({page}.md) | `{}` | {}-{} |",
            chunk.name, chunk.file_path, chunk.start_line, chunk.end_line
        );
    }
    out
}
