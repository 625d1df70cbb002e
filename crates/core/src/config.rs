use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::CatalogScheme;
use crate::error::Result;

pub const DATA_ROOT_DIR: &str = "darwinPhotoIdData";
pub const CONFIG_DIR: &str = "fincatalog";
pub const CONFIG_FILE: &str = "config.toml";

/// Everything the lifecycle operations need to know about the environment.
/// Passed explicitly; nothing reads global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Holds `surveyAreas/` and `backups/`.
    pub data_root: PathBuf,
    /// Scratch space for list files and package staging.
    pub temp_dir: PathBuf,
    /// Archiver executable, looked up on `PATH` when not absolute.
    pub archiver: PathBuf,
    /// Scheme given to newly created catalogs.
    pub default_scheme: CatalogScheme,
}

impl Default for Settings {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_root: base.join(DATA_ROOT_DIR),
            temp_dir: std::env::temp_dir(),
            archiver: PathBuf::from("7z"),
            default_scheme: CatalogScheme::default(),
        }
    }
}

impl Settings {
    /// `<config_dir>/fincatalog/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Read `path` if given, else the default config file if it exists, else
    /// fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn with_data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }
}
