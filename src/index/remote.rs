use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result, SourceError};
use crate::index::embedder::cancellable;

/// Where an ingest reads its files from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestSource {
    Local(PathBuf),
    GitHub(String),
}

impl IngestSource {
    /// Classify a user-supplied path or URL
    pub fn parse(input: &str) -> Self {
        if is_github_url(input) {
            Self::GitHub(input.to_string())
        } else {
            Self::Local(PathBuf::from(input))
        }
    }
}

pub fn is_github_url(input: &str) -> bool {
    input.starts_with("https://github.com/") || input.starts_with("git@github.com:")
}

/// A shallow clone that is deleted when dropped
pub struct Checkout {
    dir: TempDir,
    url: String,
}

impl Checkout {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Clone `url` with `git clone --depth 1` into a fresh temporary directory
pub async fn clone_repository(url: &str, cancel: &CancellationToken) -> Result<Checkout> {
    let dir = tempfile::Builder::new()
        .prefix("codescribe-")
        .tempdir()
        .map_err(SourceError::TempDir)?;

    tracing::info!(url, dest = %dir.path().display(), "cloning repository");

    let output = cancellable(cancel, async {
        Command::new("git")
            .args(["clone", "--depth", "1", "--quiet", url])
            .arg(dir.path())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::from(SourceError::Spawn(e)))
    })
    .await?;

    if !output.status.success() {
        return Err(SourceError::Clone {
            url: url.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }

    Ok(Checkout {
        dir,
        url: url.to_string(),
    })
}
