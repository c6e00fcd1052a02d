use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, SearchParams};
use crate::error::{RelevanceError, Result};
use crate::index::embedder::cancellable;
use crate::index::remote::{clone_repository, IngestSource};
use crate::index::{Generator, GoExtractor, SourceWalker};
use crate::search::build_prompt;
use crate::storage::ChunkStore;
use crate::types::{Answer, IngestSummary};

/// Ingests codebases into a [`ChunkStore`] and answers questions about them
pub struct Assistant {
    store: ChunkStore,
    generator: Arc<dyn Generator>,
    search: SearchParams,
    use_gitignore: bool,
}

impl Assistant {
    pub fn new(store: ChunkStore, generator: Arc<dyn Generator>, config: &Config) -> Self {
        Self {
            store,
            generator,
            search: config.search,
            use_gitignore: config.index.use_gitignore,
        }
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Default retrieval parameters
    pub fn search_params(&self) -> &SearchParams {
        &self.search
    }

    /// Ingest a local directory or a GitHub repository URL
    pub async fn ingest(&self, source: &str, cancel: &CancellationToken) -> Result<IngestSummary> {
        match IngestSource::parse(source) {
            IngestSource::Local(root) => self.ingest_dir(&root, cancel).await,
            IngestSource::GitHub(url) => {
                let checkout = clone_repository(&url, cancel).await?;
                let summary = self.ingest_dir(checkout.root(), cancel).await;
                tracing::debug!(url = checkout.url(), "removing checkout");
                summary
            }
        }
    }

    /// Extract and store every Go file under `root`, one batch per file.
    ///
    /// Files that fail to parse are logged and skipped; any storage or
    /// provider failure aborts the ingest. Discovery and parsing run on the
    /// blocking pool.
    pub async fn ingest_dir(&self, root: &Path, cancel: &CancellationToken) -> Result<IngestSummary> {
        let dir = root.to_path_buf();
        let use_gitignore = self.use_gitignore;
        let mut walker = tokio::task::spawn_blocking(move || -> Result<SourceWalker> {
            Ok(SourceWalker::new(&dir, GoExtractor::new()?, use_gitignore)?)
        })
        .await??;
        tracing::info!(root = %root.display(), files = walker.remaining(), "ingesting");

        let mut summary = IngestSummary::default();
        loop {
            let (returned, next) = tokio::task::spawn_blocking(move || {
                let next = walker.next();
                (walker, next)
            })
            .await?;
            walker = returned;
            let Some((path, result)) = next else {
                break;
            };

            match result {
                Ok(chunks) => {
                    summary.files_processed += 1;
                    summary.chunks_stored += self.store.store_chunks(&chunks, cancel).await?;
                }
                Err(err) => {
                    tracing::warn!(file = %path.display(), %err, "skipping file");
                    summary.skipped_files += 1;
                }
            }
        }

        self.store.ensure_index().await?;
        tracing::info!(
            root = %root.display(),
            files = summary.files_processed,
            chunks = summary.chunks_stored,
            skipped = summary.skipped_files,
            "ingest complete"
        );
        Ok(summary)
    }

    /// Drop every stored chunk
    pub async fn reset(&mut self) -> Result<()> {
        self.store.reset().await
    }

    /// Answer `question` using the default retrieval parameters
    pub async fn ask(&self, question: &str, cancel: &CancellationToken) -> Result<Answer> {
        let params = self.search;
        self.ask_with(question, &params, cancel).await
    }

    /// Answer `question` from the chunks most similar to it
    pub async fn ask_with(
        &self,
        question: &str,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        let sources = self.store.search_chunks(question, params, cancel).await?;
        if sources.is_empty() {
            if self.store.count().await? == 0 {
                return Err(RelevanceError::EmptyIndex.into());
            }
            return Err(RelevanceError::BelowThreshold {
                threshold: params.threshold,
            }
            .into());
        }

        let prompt = build_prompt(question, &sources);
        tracing::debug!(sources = sources.len(), "generating answer");
        let answer = cancellable(cancel, self.generator.generate(&prompt)).await?;

        Ok(Answer { answer, sources })
    }
}
