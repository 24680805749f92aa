//! Widget configuration
//!
//! Loaded from `config.json` in the platform config directory. Every field is
//! optional in the file; missing fields take their defaults.

use crate::utils::error::{AppError, AppResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Key the media library is stored under
pub const DEFAULT_STORAGE_KEY: &str = "cameraMediaItems";

/// Whether the media library survives a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    /// Saved to the key-value store on every change
    Persistent,
    /// Kept in memory only
    Volatile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraConfig {
    /// Requested capture width
    pub width: u32,

    /// Requested capture height
    pub height: u32,

    /// Requested frame rate
    pub fps: u32,

    /// Camera index or name (None = default camera)
    pub device_id: Option<String>,

    /// Library persistence
    pub persistence: PersistenceMode,

    /// Key of the library in the store
    pub storage_key: String,

    /// Key-value store file (None = platform data dir)
    pub store_path: Option<PathBuf>,

    /// ffmpeg executable used to encode clips
    pub ffmpeg_path: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            device_id: None,
            persistence: PersistenceMode::Persistent,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            store_path: None,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "crafter-station", "open-camstudio")
}

impl CameraConfig {
    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from `<config dir>/config.json`
    pub fn load_default() -> AppResult<Self> {
        match Self::default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Store file, falling back to `<data dir>/store.json`
    pub fn resolved_store_path(&self) -> AppResult<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join("store.json"))
            .ok_or_else(|| AppError::Config("Cannot determine data directory".to_string()))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AppError::Config(format!(
                "Invalid capture size {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(AppError::Config("Frame rate must be positive".to_string()));
        }
        if self.storage_key.trim().is_empty() {
            return Err(AppError::Config("Storage key must not be empty".to_string()));
        }
        Ok(())
    }
}
