use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Preferences persisted in `config.toml`.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub backup_root: Option<PathBuf>,
    #[serde(default)]
    pub exclude: BTreeSet<String>,
    pub keybase_bin: Option<PathBuf>,
    pub page_size: Option<usize>,
    pub max_pages: Option<usize>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("keybase-chat-backup/config.toml"))
}

impl FileConfig {
    /// Parse a config file that is known to exist.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&raw).wrap_err_with(|| format!("Failed to parse config: {}", path.display()))
    }
}

/// Load the config file. An explicit path must exist; the default location
/// is optional and yields defaults when absent.
pub fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    match explicit_path {
        Some(path) if !path.exists() => Err(eyre!("Config file not found: {}", path.display())),
        Some(path) => FileConfig::from_path(path),
        None => default_config_path()
            .filter(|p| p.exists())
            .map_or_else(|| Ok(FileConfig::default()), |p| FileConfig::from_path(&p)),
    }
}
