pub mod embedder;
pub mod gemini;
pub mod parser;
pub mod remote;
pub mod walker;

pub use embedder::{CachedEmbedder, Embedder, Generator, SharedEmbedder};
pub use gemini::GeminiClient;
pub use parser::{GoExtractor, SourceExtractor};
pub use remote::IngestSource;
pub use walker::SourceWalker;
