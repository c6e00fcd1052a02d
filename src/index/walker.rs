use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use super::parser::{GoExtractor, SourceExtractor};
use crate::error::{ParseError, SourceError};
use crate::types::CodeChunk;

/// Lazily extracts chunks from every accepted file under a root directory.
///
/// File discovery happens up front; each call to `next` reads and parses
/// one file. Chunk paths are relative to the root. The walker is consumed
/// by iteration and cannot be restarted.
pub struct SourceWalker<X = GoExtractor> {
    root: PathBuf,
    extractor: X,
    files: std::vec::IntoIter<PathBuf>,
}

impl<X: SourceExtractor> SourceWalker<X> {
    pub fn new(root: &Path, extractor: X, use_gitignore: bool) -> Result<Self, SourceError> {
        if !root.is_dir() {
            return Err(SourceError::NotADirectory(root.to_path_buf()));
        }

        // Use ignore crate's WalkBuilder for gitignore support
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .git_ignore(use_gitignore)
            .git_global(use_gitignore)
            .git_exclude(use_gitignore)
            .sort_by_file_name(|a, b| a.cmp(b));

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(%err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if extractor.accepts(entry.path()) {
                files.push(entry.into_path());
            }
        }

        tracing::debug!(root = %root.display(), files = files.len(), "discovered source files");
        Ok(Self {
            root: root.to_path_buf(),
            extractor,
            files: files.into_iter(),
        })
    }

    /// Files not yet visited
    pub fn remaining(&self) -> usize {
        self.files.len()
    }

    fn extract_file(&mut self, path: &Path) -> Result<Vec<CodeChunk>, ParseError> {
        let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rel_path = path.strip_prefix(&self.root).unwrap_or(path).to_string_lossy();
        self.extractor.extract_source(&rel_path, &source)
    }
}

impl<X: SourceExtractor> Iterator for SourceWalker<X> {
    type Item = (PathBuf, Result<Vec<CodeChunk>, ParseError>);

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files.next()?;
        let result = self.extract_file(&path);
        Some((path, result))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.files.size_hint()
    }
}
