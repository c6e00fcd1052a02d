use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StoreError};
use crate::storage::codec;

/// Embedding vectors keyed by model and input text, stored with the vector codec
pub struct EmbeddingCache {
    conn: Mutex<Connection>,
}

impl EmbeddingCache {
    /// Open or create a cache database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Result<Self> {
        let cache = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                key TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                vector BLOB,
                created_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a cached vector. A stored `NULL` decodes to the empty vector.
    pub fn get(&self, model: &str, text: &str) -> Result<Option<Vec<f32>>> {
        let blob: Option<Option<Vec<u8>>> = self
            .conn()
            .query_row(
                "SELECT vector FROM embeddings WHERE key = ?1",
                [cache_key(model, text)],
                |row| row.get(0),
            )
            .optional()?;

        match blob {
            Some(bytes) => Ok(Some(codec::decode(bytes.as_deref())?)),
            None => Ok(None),
        }
    }

    /// Insert or replace the vector for `(model, text)`
    pub fn put(&self, model: &str, text: &str, vector: &[f32]) -> Result<()> {
        let encoded = codec::encode(vector)?;
        self.write_raw(model, text, encoded.as_deref())
    }

    fn write_raw(&self, model: &str, text: &str, bytes: Option<&[u8]>) -> Result<()> {
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn().execute(
            r#"INSERT INTO embeddings (key, model, vector, created_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(key) DO UPDATE SET
                   vector = excluded.vector,
                   created_at = excluded.created_at"#,
            (cache_key(model, text), model, bytes, created_at),
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn overwrite_raw(&self, model: &str, text: &str, bytes: Option<&[u8]>) -> Result<()> {
        self.write_raw(model, text, bytes)
    }

    /// Number of cached vectors
    pub fn len(&self) -> Result<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every cached vector
    pub fn clear(&self) -> Result<()> {
        self.conn().execute("DELETE FROM embeddings", [])?;
        Ok(())
    }
}

/// Hex SHA-256 of `model`, a NUL separator and `text`
fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
