//! Canonical locations of derived marker artifacts.

use std::path::{Path, PathBuf};

use rk_core::config::PathsConfig;
use rk_core::ArtifactKind;
use uuid::Uuid;

/// Resolves artifact locations under a generated root.
///
/// Canonical files live at `{markers}/{hash}/{offset}.{ext}`, a pure
/// function of (hash, offset, kind). Encoder output is first written to
/// `{tmp}/{hash}_{offset}.{unique}.{ext}`, fresh for every encode, so two
/// encodes of the same artifact never share a temporary file.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    markers_root: PathBuf,
    tmp_root: PathBuf,
}

impl ArtifactPaths {
    pub fn new(markers_root: impl Into<PathBuf>, tmp_root: impl Into<PathBuf>) -> Self {
        Self {
            markers_root: markers_root.into(),
            tmp_root: tmp_root.into(),
        }
    }

    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(paths.markers_dir(), paths.tmp_dir())
    }

    pub fn markers_root(&self) -> &Path {
        &self.markers_root
    }

    pub fn tmp_root(&self) -> &Path {
        &self.tmp_root
    }

    /// Canonical path of an artifact, or `None` when `hash` cannot name a
    /// location (empty, or not a single path component).
    pub fn resolve(&self, hash: &str, offset_secs: u64, kind: ArtifactKind) -> Option<PathBuf> {
        if !is_valid_hash(hash) {
            return None;
        }
        Some(
            self.markers_root
                .join(hash)
                .join(format!("{offset_secs}.{}", kind.extension())),
        )
    }

    /// A new temporary output path for an artifact, outside the canonical
    /// tree. Every call returns a different path.
    pub fn temp_path(&self, hash: &str, offset_secs: u64, kind: ArtifactKind) -> Option<PathBuf> {
        if !is_valid_hash(hash) {
            return None;
        }
        Some(self.tmp_root.join(format!(
            "{hash}_{offset_secs}.{}.{}",
            Uuid::new_v4().simple(),
            kind.extension()
        )))
    }
}

fn is_valid_hash(hash: &str) -> bool {
    !hash.is_empty() && hash != "." && hash != ".." && !hash.contains(['/', '\\'])
}
