use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::storage::EmbeddingCache;

/// Turns text into a fixed-width embedding vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, used to key cached vectors
    fn model(&self) -> &str;
}

/// Produces free text from a prompt
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Embedder shared between the store, the assistant and server handlers
pub type SharedEmbedder = Arc<dyn Embedder>;

#[async_trait]
impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Run `fut` unless `cancel` fires first
pub async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        res = fut => res,
    }
}

/// Memoises another embedder's vectors in an [`EmbeddingCache`].
///
/// SQLite lookups and writes run on the blocking pool.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Arc<EmbeddingCache>,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, cache: EmbeddingCache) -> Self {
        Self {
            inner,
            cache: Arc::new(cache),
        }
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.inner.model().to_string();

        let cache = Arc::clone(&self.cache);
        let (key_model, key_text) = (model.clone(), text.to_string());
        let cached = tokio::task::spawn_blocking(move || cache.get(&key_model, &key_text)).await??;
        if let Some(vector) = cached {
            tracing::debug!(model = %model, "embedding cache hit");
            return Ok(vector);
        }

        let vector = self.inner.embed(text).await?;

        let cache = Arc::clone(&self.cache);
        let (text, stored) = (text.to_string(), vector.clone());
        tokio::task::spawn_blocking(move || cache.put(&model, &text, &stored)).await??;
        Ok(vector)
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EmbeddingError, FormatError, ProviderError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.is_empty() {
                return Err(EmbeddingError::Provider(ProviderError::EmptyResponse("embedding")).into());
            }
            Ok(vec![text.len() as f32, 1.0, 0.5])
        }

        fn model(&self) -> &str {
            "test-model"
        }
    }

    fn cached() -> (CachedEmbedder<CountingEmbedder>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let cache = EmbeddingCache::open(&dir.path().join("embeddings.db")).unwrap();
        let inner = CountingEmbedder { calls: AtomicUsize::new(0) };
        (CachedEmbedder::new(inner, cache), dir)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_inner_embedder() {
        let (embedder, _dir) = cached();

        let first = embedder.embed("Add\nadds two integers").await.unwrap();
        let second = embedder.embed("Add\nadds two integers").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.cache().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (embedder, _dir) = cached();

        assert!(embedder.embed("").await.is_err());
        assert!(embedder.embed("").await.is_err());
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(embedder.cache().len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_surfaces_format_error() {
        let (embedder, _dir) = cached();
        embedder.embed("corrupt me").await.unwrap();
        embedder
            .cache()
            .overwrite_raw("test-model", "corrupt me", Some(&[0, 9, 1]))
            .unwrap();

        let err = embedder.embed("corrupt me").await.unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::LengthMismatch { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_embeds_share_cache() {
        let (embedder, _dir) = cached();
        let embedder = Arc::new(embedder);

        let texts: Vec<String> = (0..8).map(|i| format!("Fn{i}\ndoes thing {i}")).collect();
        let tasks = texts.iter().cloned().map(|text| {
            let embedder = Arc::clone(&embedder);
            tokio::spawn(async move { embedder.embed(&text).await })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }
        assert_eq!(embedder.cache().len().unwrap(), 8);

        for text in &texts {
            embedder.embed(text).await.unwrap();
        }
        assert_eq!(embedder.inner.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let res = cancellable(&cancel, async { Ok(1) }).await;
        assert!(matches!(res, Err(Error::Cancelled)));

        let live = CancellationToken::new();
        assert_eq!(cancellable(&live, async { Ok(2) }).await.unwrap(), 2);
    }
}
