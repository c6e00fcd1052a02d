use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for codescribe
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub search: SearchParams,
    pub server: ServerConfig,
    pub index: IndexConfig,
}

/// Where and how chunks are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// LanceDB directory
    pub path: PathBuf,
    /// Embedding width; must match the provider's model
    pub dimension: usize,
    /// Memoise embeddings in `embeddings.db` next to the LanceDB directory
    pub embedding_cache: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: Config::data_dir().join("vectors"),
            dimension: 768,
            embedding_cache: true,
        }
    }
}

impl StorageConfig {
    /// Path of the SQLite embedding cache
    pub fn cache_path(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) => parent.join("embeddings.db"),
            None => PathBuf::from("embeddings.db"),
        }
    }
}

/// Generative Language API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key, literal value or "env:VAR_NAME" to read from environment
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: Some("env:GEMINI_API_KEY".into()),
            base_url: "https://generativelanguage.googleapis.com".into(),
            embedding_model: "models/embedding-001".into(),
            generation_model: "models/gemini-2.0-flash-001".into(),
            temperature: 0.3,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key, supporting "env:VAR_NAME" syntax
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.as_ref().and_then(|key| {
            if let Some(var_name) = key.strip_prefix("env:") {
                std::env::var(var_name).ok().filter(|v| !v.is_empty())
            } else if key.is_empty() {
                None
            } else {
                Some(key.clone())
            }
        })
    }
}

/// Result cap and similarity cut-off for retrieval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Maximum number of chunks returned
    pub top_k: usize,
    /// Only chunks with similarity strictly above this are returned
    pub threshold: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Configuration for directory walking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Whether to respect .gitignore
    pub use_gitignore: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load `explicit` if given, else the user config file if present, else defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Point storage at `dir`, keeping the `vectors` layout
    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.storage.path = dir.join("vectors");
        self
    }

    /// Platform data directory, falling back to `.codescribe` in the working directory
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("dev", "codescribe", "codescribe")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".codescribe"))
    }

    /// Get the user config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "codescribe", "codescribe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
