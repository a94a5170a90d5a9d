//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries all
//! sub-configs for the database, generated paths, external tools and the
//! generation pipeline. Every section defaults sensibly so an empty file is
//! valid. The value is passed explicitly to whatever needs it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::{Error, HashAlgorithm};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub generate: GenerateConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.generate.marker_width == 0 {
            warnings.push("generate.marker_width is 0; encoders need a positive width".into());
        }
        if self.generate.marker_width % 2 != 0 {
            warnings.push(format!(
                "generate.marker_width {} is odd; H.264 output requires an even width",
                self.generate.marker_width
            ));
        }
        if self.generate.encode_timeout_secs == 0 {
            warnings.push("generate.encode_timeout_secs is 0; every encode will time out".into());
        }
        if self.paths.generated.as_os_str().is_empty() {
            warnings.push("paths.generated is empty".into());
        }
        for (name, path) in [
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!("tools.{name} {} does not exist", p.display()));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Relational store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./reelkeep.db"),
            max_connections: 4,
        }
    }
}

/// Filesystem roots for derived artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub generated: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            generated: PathBuf::from("./generated"),
        }
    }
}

impl PathsConfig {
    /// Root of the marker artifact tree.
    pub fn markers_dir(&self) -> PathBuf {
        self.generated.join("markers")
    }

    /// Root for temporary encoder outputs.
    pub fn tmp_dir(&self) -> PathBuf {
        self.generated.join("tmp")
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Derived-artifact generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Maximum number of generation tasks running at once (0 = CPU count).
    pub parallel_tasks: usize,
    /// Output width in pixels for clips and previews.
    pub marker_width: u32,
    /// Upper bound on a single encoder invocation.
    pub encode_timeout_secs: u64,
    /// Which scene hash keys the artifact directories.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            parallel_tasks: 0,
            marker_width: 640,
            encode_timeout_secs: 300,
            hash_algorithm: HashAlgorithm::Md5,
        }
    }
}

impl GenerateConfig {
    /// Effective concurrency limit, resolving 0 to the CPU count.
    pub fn concurrency(&self) -> usize {
        if self.parallel_tasks == 0 {
            num_cpus::get().max(1)
        } else {
            self.parallel_tasks
        }
    }

    pub fn encode_timeout(&self) -> Duration {
        Duration::from_secs(self.encode_timeout_secs)
    }
}
