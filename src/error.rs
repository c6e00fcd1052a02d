//! Error kinds shared by the extractor, the chunk store and the providers.

use std::path::PathBuf;

/// Top-level error for every core operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Relevance(#[from] RelevanceError),

    #[error("text generation failed: {0}")]
    Generation(#[source] ProviderError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A single source file could not be turned into chunks.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("syntax error in {path} at line {line}, column {column}")]
    Syntax {
        path: String,
        line: usize,
        column: usize,
    },

    #[error("parser returned no tree for {0}")]
    NoTree(String),

    #[error("failed to load grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
}

/// Failure talking to an external model provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response contained no {0}")]
    EmptyResponse(&'static str),

    #[error("no API key configured (set GEMINI_API_KEY or provider.api_key)")]
    MissingApiKey,
}

/// Embedding could not be produced or has the wrong shape.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// Binary or document data does not decode.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("vector buffer of {0} bytes is shorter than the 2-byte header")]
    TruncatedHeader(usize),

    #[error(
        "vector buffer length mismatch: header declares {dimension} values ({expected} bytes), got {actual} bytes"
    )]
    LengthMismatch {
        dimension: u16,
        expected: usize,
        actual: usize,
    },

    #[error("vector of {0} values exceeds the 65535 value limit")]
    DimensionOverflow(usize),

    #[error("malformed chunk document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("lancedb error: {0}")]
    Lance(#[from] lancedb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected table layout: {0}")]
    Schema(String),
}

/// A question could not be grounded in stored content.
#[derive(Debug, thiserror::Error)]
pub enum RelevanceError {
    #[error("nothing has been ingested yet; ingest a codebase first")]
    EmptyIndex,

    #[error("no relevant content found above similarity {threshold:.2}")]
    BelowThreshold { threshold: f32 },
}

/// The ingest source is unusable.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to create checkout directory: {0}")]
    TempDir(#[source] std::io::Error),

    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git clone of {url} failed: {stderr}")]
    Clone { url: String, stderr: String },
}

impl From<lancedb::Error> for Error {
    fn from(err: lancedb::Error) -> Self {
        Error::Store(StoreError::Lance(err))
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(err: arrow::error::ArrowError) -> Self {
        Error::Store(StoreError::Arrow(err))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(StoreError::Sqlite(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Format(FormatError::Document(err))
    }
}
