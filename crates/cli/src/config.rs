//! CLI configuration utilities

use anyhow::{Context, Result};
use kuteera_core::KuteeraConfig;
use std::path::{Path, PathBuf};

/// Loaded configuration plus the directory the CLI keeps its state in
pub struct Settings {
    pub config: KuteeraConfig,
    pub data_dir: PathBuf,
}

impl Settings {
    /// Session file: the configured path, or `session.json` in the data directory
    pub fn session_path(&self) -> PathBuf {
        self.config.storage.resolve_path(Some(&self.data_dir))
    }
}

/// Load layered configuration and resolve the data directory
pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Settings> {
    let config = KuteeraConfig::load(config_path).context("failed to load configuration")?;
    let data_dir = data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kuteera")
    });
    Ok(Settings { config, data_dir })
}
