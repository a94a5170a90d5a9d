//! Config file discovery for the command line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rk_core::config::Config;

const DEFAULT_PATHS: &[&str] = &[
    "./reelkeep.toml",
    "~/.config/reelkeep/config.toml",
    "/etc/reelkeep/config.toml",
];

/// First existing file among the default locations.
pub fn find_config() -> Option<PathBuf> {
    DEFAULT_PATHS.iter().find_map(|path_str| {
        let path = PathBuf::from(shellexpand::tilde(path_str).as_ref());
        path.exists().then_some(path)
    })
}

/// Load the config at `custom_path`, or from the first default location
/// that exists, or fall back to defaults.
///
/// An explicitly given path must exist and parse.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match find_config() {
        Some(path) => load_config(&path),
        None => {
            tracing::debug!("No config file found; using defaults");
            Ok(Config::default())
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    for warning in config.validate() {
        tracing::warn!("Config: {warning}");
    }
    Ok(config)
}
