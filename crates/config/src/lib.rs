//! Pressroom's config directory
//!
//! ```text
//! ~/.config/pressroom/          ($PRESSROOM_CONFIG_DIR when set)
//!   settings.json               optional overrides for the runtime settings
//!   brands.json                 optional brand definitions
//!   pressroom.sqlite            default database
//!   backups/                    default backup directory
//!   uploads/                    default asset library
//! ```
//!
//! Locate the directory with [`ConfigDir::locate`] at startup and call
//! [`ConfigDir::ensure`] before anything writes into it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Environment variable that moves the whole config directory
pub const CONFIG_DIR_ENV: &str = "PRESSROOM_CONFIG_DIR";

pub const SETTINGS_FILE: &str = "settings.json";
pub const BRANDS_FILE: &str = "brands.json";
pub const DATABASE_FILE: &str = "pressroom.sqlite";
pub const BACKUPS_DIR: &str = "backups";
pub const UPLOADS_DIR: &str = "uploads";

/// Name of the config directory under the platform config root
const APP_DIR: &str = "pressroom";

/// Root of Pressroom's configuration and default data locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// `$PRESSROOM_CONFIG_DIR`, else `pressroom/` under the platform config root
    pub fn locate() -> Result<Self> {
        Self::locate_with(|key| std::env::var_os(key))
    }

    fn locate_with(env: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        if let Some(dir) = env(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(dir));
        }
        let base = dirs::config_dir().context("Could not determine config directory")?;
        Ok(Self::at(base.join(APP_DIR)))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory and the default data directories inside it
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.root.clone(), self.backups_dir(), self.uploads_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Path of a file within the directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.path(SETTINGS_FILE)
    }

    pub fn database_path(&self) -> PathBuf {
        self.path(DATABASE_FILE)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.path(BACKUPS_DIR)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.path(UPLOADS_DIR)
    }

    /// `brands.json`, if the user has put one there
    pub fn brands_file(&self) -> Option<PathBuf> {
        Some(self.path(BRANDS_FILE)).filter(|p| p.is_file())
    }

    /// Parse a JSON file from the directory; a missing file is `None`
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(None);
        }
        load_json_file(&path).map(Some)
    }
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
