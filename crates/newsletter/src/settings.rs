//! Runtime settings for Pressroom
//!
//! Each setting is resolved independently, in order of priority:
//! 1. Environment variables (`PRESSROOM_DB_PATH`, `PRESSROOM_BACKUP_DIR`,
//!    `PRESSROOM_OUTPUT_DIR`, `PRESSROOM_UPLOADS_DIR`, `PRESSROOM_BRANDS_FILE`)
//! 2. `settings.json` in the config directory
//! 3. Defaults inside the config directory (output goes to ./outputs, and
//!    `brands.json` is used when present)

use std::path::PathBuf;

use anyhow::Result;
use config::{ConfigDir, SETTINGS_FILE};
use serde::{Deserialize, Serialize};

/// Resolved settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Asset library that uploads are copied into
    pub uploads_dir: PathBuf,
    /// Brand definitions replacing the built-in brands
    pub brands_file: Option<PathBuf>,
}

/// On-disk format; every field optional
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    db_path: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    uploads_dir: Option<PathBuf>,
    brands_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the environment, `settings.json` and defaults
    pub fn load(config: &ConfigDir) -> Result<Self> {
        let file = config.read_json(SETTINGS_FILE)?.unwrap_or_default();
        Ok(Self::resolve(file, config, |key| std::env::var(key).ok()))
    }

    fn resolve(
        file: SettingsFile,
        config: &ConfigDir,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env_path = |key: &str| env(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        Self {
            db_path: env_path("PRESSROOM_DB_PATH")
                .or(file.db_path)
                .unwrap_or_else(|| config.database_path()),
            backup_dir: env_path("PRESSROOM_BACKUP_DIR")
                .or(file.backup_dir)
                .unwrap_or_else(|| config.backups_dir()),
            output_dir: env_path("PRESSROOM_OUTPUT_DIR")
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from("outputs")),
            uploads_dir: env_path("PRESSROOM_UPLOADS_DIR")
                .or(file.uploads_dir)
                .unwrap_or_else(|| config.uploads_dir()),
            brands_file: env_path("PRESSROOM_BRANDS_FILE")
                .or(file.brands_file)
                .or_else(|| config.brands_file()),
        }
    }
}
