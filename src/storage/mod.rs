pub mod codec;
pub mod lance;
pub mod sqlite;

pub use self::lance::ChunkStore;
pub use self::sqlite::EmbeddingCache;
