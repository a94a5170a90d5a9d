//! Derived artifact storage on the local filesystem.

use std::fs::File;
use std::path::Path;

use rk_core::{ArtifactKind, Result};

use crate::paths::ArtifactPaths;

/// Existence checks and atomic placement for marker artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    paths: ArtifactPaths,
}

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// True only if the artifact's canonical file is present and readable.
    /// An empty hash never has an artifact.
    pub fn exists(&self, hash: &str, offset_secs: u64, kind: ArtifactKind) -> bool {
        match self.paths.resolve(hash, offset_secs, kind) {
            Some(path) => is_readable_file(&path),
            None => false,
        }
    }

    /// Make sure the temporary output directory exists.
    pub async fn prepare_temp_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.paths.tmp_root()).await?;
        Ok(())
    }

    /// Move a finished temporary file to its canonical path with one rename.
    ///
    /// Readers of `final_path` see either the previous file or the new one.
    /// On failure the temporary file stays where it is, the canonical path
    /// is untouched, and an [`rk_core::Error::Io`] is returned.
    pub async fn place_atomically(&self, temp_path: &Path, final_path: &Path) -> Result<()> {
        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(temp_path, final_path).await?;
        tracing::debug!(
            from = %temp_path.display(),
            to = %final_path.display(),
            "Placed artifact"
        );
        Ok(())
    }
}

fn is_readable_file(path: &Path) -> bool {
    File::open(path)
        .and_then(|f| f.metadata())
        .map(|m| m.is_file())
        .unwrap_or(false)
}
