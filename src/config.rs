//! Store and CLI configuration
//!
//! The CLI reads optional defaults from ~/.config/blobdb/config.json;
//! command-line flags take precedence over anything found there.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for a [`BlobStore`](crate::BlobStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// fsync staged bytes before the rename that publishes them
    pub sync_writes: bool,
    /// Permission bits for directories the store creates (unix only)
    pub dir_mode: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_writes: true,
            dir_mode: 0o700,
        }
    }
}

/// Defaults for the `blobdb` command line tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Store root used when `--root` is not given
    pub root: Option<PathBuf>,
    /// Settings passed through to the store
    pub store: StoreConfig,
}

impl CliConfig {
    /// Default config file location (~/.config/blobdb/config.json), if the
    /// platform has a config directory at all
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("blobdb").join("config.json"))
    }

    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load from the default location; defaults when there is no config directory
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Write to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;
        Ok(())
    }
}
