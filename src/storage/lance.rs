use arrow::array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use futures::TryStreamExt;
use lancedb::index::vector::IvfPqIndexBuilder;
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{SearchParams, StorageConfig};
use crate::error::{EmbeddingError, Error, Result, StoreError};
use crate::index::embedder::{cancellable, SharedEmbedder};
use crate::types::{CodeChunk, SearchResult};

/// Table name for chunk storage
pub const TABLE_NAME: &str = "code_chunks";

/// Rows required before the product quantiser can be trained
pub const MIN_INDEX_ROWS: usize = 256;

const MAX_PARTITIONS: u32 = 100;

/// Search every IVF partition; the threshold needs the true nearest rows
const SEARCH_NPROBES: usize = MAX_PARTITIONS as usize;

/// Quantised candidates fetched per requested result, then re-scored on raw vectors
const REFINE_FACTOR: u32 = 20;

/// Extract a named column of the given array type from a batch.
fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::Schema(format!("missing column '{name}'")))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| StoreError::Schema(format!("column '{name}' has the wrong type")).into())
}

/// Function chunks and their embeddings, searchable by cosine similarity
pub struct ChunkStore {
    conn: Connection,
    table: Table,
    embedder: SharedEmbedder,
    /// Embedding width fixed by the `vector` column
    dimension: i32,
}

impl ChunkStore {
    /// Open (creating if needed) the store described by `config`
    pub async fn open(config: &StorageConfig, embedder: SharedEmbedder) -> Result<Self> {
        let (conn, dimension) = Self::connect(config).await?;
        let table = Self::ensure_schema(&conn, dimension).await?;

        let store = Self {
            conn,
            table,
            embedder,
            dimension,
        };
        store.ensure_index().await?;
        Ok(store)
    }

    async fn connect(config: &StorageConfig) -> Result<(Connection, i32)> {
        let dimension = i32::try_from(config.dimension)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| StoreError::Schema(format!("invalid dimension {}", config.dimension)))?;

        std::fs::create_dir_all(&config.path).map_err(|source| StoreError::Io {
            path: config.path.clone(),
            source,
        })?;
        let path = config
            .path
            .to_str()
            .ok_or_else(|| StoreError::Schema(format!("non-UTF8 path {}", config.path.display())))?;

        let conn = connect(path).execute().await?;
        Ok((conn, dimension))
    }

    /// Width of the vectors this store accepts
    pub fn dimension(&self) -> usize {
        self.dimension as usize
    }

    fn vector_field() -> FieldRef {
        Arc::new(Field::new("item", DataType::Float32, true))
    }

    fn schema(dimension: i32) -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("file_path", DataType::Utf8, false),
            Field::new("chunk", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(Self::vector_field(), dimension),
                false,
            ),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Create the table if absent and check the width of an existing one.
    async fn ensure_schema(conn: &Connection, dimension: i32) -> Result<Table> {
        let tables = conn.table_names().execute().await?;
        if !tables.iter().any(|t| t == TABLE_NAME) {
            tracing::info!(table = TABLE_NAME, dimension, "creating chunk table");
            return Ok(conn
                .create_empty_table(TABLE_NAME, Self::schema(dimension))
                .execute()
                .await?);
        }

        let table = conn.open_table(TABLE_NAME).execute().await?;
        let schema = table.schema().await?;
        let width = match schema.field_with_name("vector").map(|f| f.data_type()) {
            Ok(DataType::FixedSizeList(_, width)) => *width,
            _ => {
                return Err(
                    StoreError::Schema(format!("{TABLE_NAME} has no fixed-size vector column")).into(),
                )
            }
        };
        if width != dimension {
            return Err(StoreError::Schema(format!(
                "{TABLE_NAME} stores {width}-dimensional vectors but {dimension} are configured"
            ))
            .into());
        }
        Ok(table)
    }

    /// Build the IVF-PQ cosine index once enough rows exist.
    ///
    /// Returns whether an index was created.
    pub async fn ensure_index(&self) -> Result<bool> {
        let rows = self.table.count_rows(None).await?;
        if rows < MIN_INDEX_ROWS {
            return Ok(false);
        }

        let indices = self.table.list_indices().await?;
        if indices.iter().any(|idx| idx.columns.iter().any(|c| c == "vector")) {
            return Ok(false);
        }

        let partitions = index_partitions(rows);
        let sub_vectors = index_sub_vectors(self.dimension);
        tracing::info!(rows, partitions, sub_vectors, "building vector index");

        self.table
            .create_index(
                &["vector"],
                Index::IvfPq(
                    IvfPqIndexBuilder::default()
                        .distance_type(DistanceType::Cosine)
                        .num_partitions(partitions)
                        .num_sub_vectors(sub_vectors),
                ),
            )
            .execute()
            .await?;
        Ok(true)
    }

    /// Drop every stored chunk and recreate an empty table
    pub async fn reset(&mut self) -> Result<()> {
        self.table = Self::recreate_table(&self.conn, self.dimension).await?;
        Ok(())
    }

    /// Reset the store at `config.path` without opening it for queries.
    ///
    /// Used where no embedder is available; the table is recreated with the
    /// configured dimension.
    pub async fn reset_at(config: &StorageConfig) -> Result<()> {
        let (conn, dimension) = Self::connect(config).await?;
        Self::recreate_table(&conn, dimension).await?;
        Ok(())
    }

    async fn recreate_table(conn: &Connection, dimension: i32) -> Result<Table> {
        let tables = conn.table_names().execute().await?;
        if tables.iter().any(|t| t == TABLE_NAME) {
            conn.drop_table(TABLE_NAME).await?;
        }
        let table = conn
            .create_empty_table(TABLE_NAME, Self::schema(dimension))
            .execute()
            .await?;
        tracing::info!(table = TABLE_NAME, dimension, "chunk table reset");
        Ok(table)
    }

    /// Embed and persist a batch of chunks as a single commit.
    ///
    /// Every chunk is embedded before anything is written, so a failing
    /// embedding or a cancellation leaves the table untouched.
    pub async fn store_chunks(
        &self,
        chunks: &[CodeChunk],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = self.embed_checked(&chunk.embedding_text(), cancel).await?;
            tracing::debug!(name = %chunk.name, file = %chunk.file_path, "embedded chunk");
            vectors.push(vector);
        }

        let batch = self.to_record_batch(chunks, &vectors)?;
        let schema = batch.schema();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.table
            .add(RecordBatchIterator::new(std::iter::once(Ok(batch)), schema))
            .execute()
            .await?;

        tracing::info!(
            chunks = chunks.len(),
            file = %chunks[0].file_path,
            "stored chunk batch"
        );
        Ok(chunks.len())
    }

    /// Find stored chunks most similar to `query`.
    ///
    /// Results are limited to `params.top_k`, restricted to similarity
    /// strictly above `params.threshold` and ordered most similar first.
    /// Once the IVF-PQ index exists, every partition is searched and the
    /// candidates are re-ranked with exact cosine distances, so indexing
    /// changes latency but not results.
    pub async fn search_chunks(
        &self,
        query: &str,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        if params.top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embed_checked(query, cancel).await?;
        tracing::debug!(top_k = params.top_k, threshold = params.threshold, "searching chunks");

        let batches = cancellable(cancel, async {
            let stream = self
                .table
                .vector_search(vector)?
                .distance_type(DistanceType::Cosine)
                .nprobes(SEARCH_NPROBES)
                .refine_factor(REFINE_FACTOR)
                .limit(params.top_k)
                .execute()
                .await?;
            let batches: Vec<RecordBatch> = stream.try_collect().await?;
            Ok::<_, Error>(batches)
        })
        .await?;

        let mut results = Self::batches_to_results(&batches)?;
        results.retain(|r| r.similarity > params.threshold);
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(results)
    }

    /// Total number of stored chunks
    pub async fn count(&self) -> Result<u64> {
        Ok(self.table.count_rows(None).await? as u64)
    }

    async fn embed_checked(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>> {
        let vector = cancellable(cancel, self.embedder.embed(text)).await?;
        if vector.len() != self.dimension() {
            return Err(EmbeddingError::Dimension {
                expected: self.dimension(),
                actual: vector.len(),
            }
            .into());
        }
        Ok(vector)
    }

    fn to_record_batch(&self, chunks: &[CodeChunk], vectors: &[Vec<f32>]) -> Result<RecordBatch> {
        let created_at = chrono::Utc::now().to_rfc3339();

        let ids: Vec<String> = chunks
            .iter()
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect();
        let file_paths: Vec<&str> = chunks.iter().map(|c| c.file_path.as_str()).collect();
        let documents = chunks
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let created: Vec<&str> = chunks.iter().map(|_| created_at.as_str()).collect();

        let flat: Vec<f32> = vectors.iter().flatten().copied().collect();
        let values: ArrayRef = Arc::new(Float32Array::from(flat));
        let vector_array =
            FixedSizeListArray::try_new(Self::vector_field(), self.dimension, values, None)?;

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(file_paths)),
            Arc::new(StringArray::from(documents)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(created)),
        ];
        Ok(RecordBatch::try_new(Self::schema(self.dimension), columns)?)
    }

    fn batches_to_results(batches: &[RecordBatch]) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();

        for batch in batches {
            let documents = column::<StringArray>(batch, "chunk")?;
            // LanceDB adds _distance column for search results
            let distances = column::<Float32Array>(batch, "_distance")?;

            for i in 0..batch.num_rows() {
                let chunk: CodeChunk = serde_json::from_str(documents.value(i))?;
                let distance = if distances.is_null(i) { 1.0 } else { distances.value(i) };
                results.push(SearchResult {
                    chunk,
                    similarity: 1.0 - distance,
                });
            }
        }

        Ok(results)
    }
}

/// `clamp(sqrt(rows), 1, 100)`
fn index_partitions(rows: usize) -> u32 {
    let root = (rows as f64).sqrt() as u32;
    root.clamp(1, MAX_PARTITIONS)
}

/// `dimension / 16` when it divides evenly, otherwise a single sub-vector
fn index_sub_vectors(dimension: i32) -> u32 {
    if dimension >= 16 && dimension % 16 == 0 {
        (dimension / 16) as u32
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::index::embedder::Embedder;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::tempdir;

    const DIM: usize = 768;

    /// Maps the first line of the embedded text (the chunk name) to a vector
    struct TableEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let key = text.lines().next().unwrap_or_default();
            if self.fail_on.as_deref() == Some(key) {
                return Err(EmbeddingError::Provider(ProviderError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
                .into());
            }
            Ok(self
                .vectors
                .get(key)
                .cloned()
                .unwrap_or_else(|| unit(DIM, 1)))
        }

        fn model(&self) -> &str {
            "table"
        }
    }

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    /// Vector whose cosine similarity with the first axis is `s`
    fn at_similarity(s: f32) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[0] = s;
        v[1] = (1.0 - s * s).sqrt();
        v
    }

    fn chunk(name: &str, file: &str) -> CodeChunk {
        CodeChunk {
            name: name.to_string(),
            description: String::new(),
            language: "go".to_string(),
            parameters: Vec::new(),
            returns: Vec::new(),
            file_path: file.to_string(),
            start_line: 1,
            end_line: 3,
        }
    }

    fn storage_config(path: &Path, dimension: usize) -> StorageConfig {
        StorageConfig {
            path: path.join("vectors"),
            dimension,
            embedding_cache: false,
        }
    }

    async fn open_store(path: &Path, embedder: TableEmbedder) -> ChunkStore {
        ChunkStore::open(&storage_config(path, DIM), Arc::new(embedder))
            .await
            .unwrap()
    }

    fn embedder(entries: &[(&str, Vec<f32>)]) -> TableEmbedder {
        TableEmbedder {
            vectors: entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            fail_on: None,
        }
    }

    #[tokio::test]
    async fn test_open_creates_empty_table() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), embedder(&[])).await;
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.dimension(), DIM);
    }

    #[tokio::test]
    async fn test_store_and_count() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), embedder(&[])).await;
        let cancel = CancellationToken::new();

        let stored = store
            .store_chunks(&[chunk("A", "a.go"), chunk("B", "a.go")], &cancel)
            .await
            .unwrap();
        assert_eq!(stored, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        assert_eq!(store.store_chunks(&[], &cancel).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_embedding_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut table = embedder(&[]);
        table.fail_on = Some("C".to_string());
        let store = open_store(dir.path(), table).await;

        let batch: Vec<CodeChunk> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|n| chunk(n, "five.go"))
            .collect();
        let err = store
            .store_chunks(&batch, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Embedding(EmbeddingError::Provider(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), embedder(&[("Short", vec![1.0; 3])])).await;

        let err = store
            .store_chunks(&[chunk("Short", "s.go")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Embedding(EmbeddingError::Dimension { expected: 768, actual: 3 })
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_store_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), embedder(&[])).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store
            .store_chunks(&[chunk("A", "a.go")], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_applies_threshold_and_order() {
        let dir = tempdir().unwrap();
        let store = open_store(
            dir.path(),
            embedder(&[
                ("query", unit(DIM, 0)),
                ("Mid", at_similarity(0.75)),
                ("Low", at_similarity(0.65)),
                ("High", at_similarity(0.9)),
            ]),
        )
        .await;
        let cancel = CancellationToken::new();
        store
            .store_chunks(
                &[chunk("Mid", "m.go"), chunk("Low", "l.go"), chunk("High", "h.go")],
                &cancel,
            )
            .await
            .unwrap();

        let results = store
            .search_chunks("query", &SearchParams::default(), &cancel)
            .await
            .unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.chunk.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Mid"]);
        assert!((results[0].similarity - 0.9).abs() < 1e-4);
        assert!((results[1].similarity - 0.75).abs() < 1e-4);
        assert_eq!(results[0].chunk.file_path, "h.go");
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let dir = tempdir().unwrap();
        let names = ["F1", "F2", "F3", "F4", "F5", "F6", "F7"];
        let entries: Vec<(&str, Vec<f32>)> = std::iter::once(("query", unit(DIM, 0)))
            .chain(names.iter().map(|n| (*n, at_similarity(0.95))))
            .collect();
        let store = open_store(dir.path(), embedder(&entries)).await;
        let cancel = CancellationToken::new();

        let chunks: Vec<CodeChunk> = names.iter().map(|n| chunk(n, "many.go")).collect();
        store.store_chunks(&chunks, &cancel).await.unwrap();

        let results = store
            .search_chunks("query", &SearchParams::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(results.len(), 5);

        let none = store
            .search_chunks("query", &SearchParams { top_k: 0, threshold: 0.7 }, &cancel)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), embedder(&[])).await;
        let results = store
            .search_chunks("anything", &SearchParams::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_stored_document_round_trips() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), embedder(&[("query", unit(DIM, 0)), ("Add", unit(DIM, 0))])).await;
        let cancel = CancellationToken::new();

        let mut add = chunk("Add", "math/add.go");
        add.description = "Add adds two integers.".to_string();
        add.parameters = vec![crate::types::Parameter {
            name: "a".to_string(),
            type_name: "int".to_string(),
        }];
        add.returns = vec!["int".to_string()];

        store.store_chunks(std::slice::from_ref(&add), &cancel).await.unwrap();
        let results = store
            .search_chunks("query", &SearchParams::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk, add);
    }

    #[tokio::test]
    async fn test_reopen_persists_and_checks_dimension() {
        let dir = tempdir().unwrap();
        {
            let store = open_store(dir.path(), embedder(&[])).await;
            store
                .store_chunks(&[chunk("Kept", "k.go")], &CancellationToken::new())
                .await
                .unwrap();
        }

        let store = open_store(dir.path(), embedder(&[])).await;
        assert_eq!(store.count().await.unwrap(), 1);

        let mismatched = ChunkStore::open(&storage_config(dir.path(), 384), Arc::new(embedder(&[]))).await;
        assert!(matches!(mismatched, Err(Error::Store(StoreError::Schema(_)))));
    }

    #[tokio::test]
    async fn test_reset_drops_rows() {
        let dir = tempdir().unwrap();
        let mut store = open_store(dir.path(), embedder(&[])).await;
        store
            .store_chunks(&[chunk("Gone", "g.go")], &CancellationToken::new())
            .await
            .unwrap();

        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_at_recreates_with_configured_dimension() {
        let dir = tempdir().unwrap();
        {
            let store = open_store(dir.path(), embedder(&[])).await;
            store
                .store_chunks(&[chunk("Gone", "g.go")], &CancellationToken::new())
                .await
                .unwrap();
        }

        let narrow = storage_config(dir.path(), 384);
        ChunkStore::reset_at(&narrow).await.unwrap();

        let reopened = ChunkStore::open(&narrow, Arc::new(embedder(&[]))).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 0);
        assert_eq!(reopened.dimension(), 384);
    }

    #[tokio::test]
    async fn test_index_built_only_with_enough_rows() {
        const SMALL: usize = 32;
        struct Spread;

        #[async_trait]
        impl Embedder for Spread {
            async fn embed(&self, text: &str) -> Result<Vec<f32>> {
                let seed = text
                    .bytes()
                    .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
                Ok((0..SMALL)
                    .map(|i| ((seed as f32) * 0.001 + i as f32).sin())
                    .collect())
            }

            fn model(&self) -> &str {
                "spread"
            }
        }

        let dir = tempdir().unwrap();
        let store = ChunkStore::open(&storage_config(dir.path(), SMALL), Arc::new(Spread))
            .await
            .unwrap();
        let cancel = CancellationToken::new();

        let few: Vec<CodeChunk> = (0..10).map(|i| chunk(&format!("Fn{i}"), "few.go")).collect();
        store.store_chunks(&few, &cancel).await.unwrap();
        assert!(!store.ensure_index().await.unwrap());

        let many: Vec<CodeChunk> = (10..300).map(|i| chunk(&format!("Fn{i}"), "many.go")).collect();
        store.store_chunks(&many, &cancel).await.unwrap();
        assert!(store.ensure_index().await.unwrap());
        assert!(!store.ensure_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_search_unchanged_by_index() {
        const WIDE: usize = 64;

        /// `T_<permille>` lies at that similarity to the first axis, `query`
        /// on it; anything else is scattered noise far below the targets
        struct Scattered;

        #[async_trait]
        impl Embedder for Scattered {
            async fn embed(&self, text: &str) -> Result<Vec<f32>> {
                let key = text.lines().next().unwrap_or_default();
                let mut v = vec![0.0; WIDE];
                if key == "query" {
                    v[0] = 1.0;
                } else if let Some(permille) = key.strip_prefix("T_") {
                    let s = permille.parse::<f32>().unwrap() / 1000.0;
                    v[0] = s;
                    v[1] = (1.0 - s * s).sqrt();
                } else {
                    let mut state = key
                        .bytes()
                        .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
                    for x in &mut v {
                        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                        *x = (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
                    }
                }
                Ok(v)
            }

            fn model(&self) -> &str {
                "scattered"
            }
        }

        let dir = tempdir().unwrap();
        let store = ChunkStore::open(&storage_config(dir.path(), WIDE), Arc::new(Scattered))
            .await
            .unwrap();
        let cancel = CancellationToken::new();

        let mut chunks: Vec<CodeChunk> = (0..400)
            .map(|i| chunk(&format!("Noise{i}"), "noise.go"))
            .collect();
        for name in ["T_900", "T_720", "T_710", "T_690", "T_680"] {
            chunks.push(chunk(name, "targets.go"));
        }
        store.store_chunks(&chunks, &cancel).await.unwrap();

        let strict = SearchParams {
            top_k: 5,
            threshold: 0.7,
        };
        let loose = SearchParams {
            top_k: 5,
            threshold: -1.0,
        };
        let search = |params: SearchParams| {
            let store = &store;
            let cancel = &cancel;
            async move {
                store
                    .search_chunks("query", &params, cancel)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|r| (r.chunk.name, r.similarity))
                    .collect::<Vec<_>>()
            }
        };

        let flat_strict = search(strict).await;
        let flat_loose = search(loose).await;
        let names = |rs: &[(String, f32)]| rs.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>();
        assert_eq!(names(&flat_strict), vec!["T_900", "T_720", "T_710"]);
        assert_eq!(
            names(&flat_loose),
            vec!["T_900", "T_720", "T_710", "T_690", "T_680"]
        );

        assert!(store.ensure_index().await.unwrap());

        for (flat, params) in [(&flat_strict, strict), (&flat_loose, loose)] {
            let indexed = search(params).await;
            assert_eq!(names(&indexed), names(flat));
            for ((_, before), (_, after)) in flat.iter().zip(&indexed) {
                assert!((before - after).abs() < 1e-4, "{before} vs {after}");
            }
        }
    }

    #[test]
    fn test_index_parameters() {
        assert_eq!(index_partitions(256), 16);
        assert_eq!(index_partitions(1), 1);
        assert_eq!(index_partitions(1_000_000), 100);
        assert_eq!(index_sub_vectors(768), 48);
        assert_eq!(index_sub_vectors(32), 2);
        assert_eq!(index_sub_vectors(10), 1);
    }
}
