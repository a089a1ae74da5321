//! Persistent settings.
//!
//! Stored as JSON in the platform config directory. Anything missing from the
//! file falls back to its default, so older files keep loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::canvas::Palette;
use crate::error::ConfigError;
use crate::export::DEFAULT_MAX_IMAGE_SIZE;
use crate::keyboard::KeyboardShortcuts;
use crate::session::DEFAULT_HISTORY_LIMIT;

const APP_DIR: &str = "anchor-crop";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub shortcuts: KeyboardShortcuts,
    /// Colors referenced from drawing code as `var(--name)`
    pub palette: Palette,
    pub anchor_color: String,
    pub anchor_size: f32,
    pub anchor_glow: bool,
    /// Anchor hit tolerance in screen points
    pub hit_radius: f32,
    pub history_limit: usize,
    pub max_image_width: u32,
    pub max_image_height: u32,
    /// Export at the display's pixel ratio instead of 1:1
    pub hidpi_export: bool,
    /// When set, exports are written here without a save dialog
    pub output_dir: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        let palette = [
            ("--anchor-color", "#1e90ff"),
            ("--anchor-active", "#ff8c00"),
            ("--crop-border", "#ffffff"),
            ("--overlay", "rgba(0, 0, 0, 0.6)"),
            ("--canvas-bg", "#202020"),
            ("--text", "#f0f0f0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            shortcuts: KeyboardShortcuts::default(),
            palette,
            anchor_color: "var(--anchor-color)".to_string(),
            anchor_size: 12.0,
            anchor_glow: true,
            hit_radius: 12.0,
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_image_width: DEFAULT_MAX_IMAGE_SIZE,
            max_image_height: DEFAULT_MAX_IMAGE_SIZE,
            hidpi_export: false,
            output_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }
}
