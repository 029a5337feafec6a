//! Top-level application configuration.
//!
//! Configuration is stored in `.sprintdesk/config.yaml` and includes:
//! - Default page size for collection fetches
//! - Outside-dismiss timing and the overlay classes it recognizes
//! - Detail panel width settings

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{DeskError, Result};
use crate::types::DESK_DIR;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "SPRINTDESK_CONFIG";

pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rows per page for requirement collections (default: 20)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub dismiss: DismissConfig,

    #[serde(default)]
    pub panel: PanelConfig,
}

fn default_page_size() -> u32 {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            dismiss: DismissConfig::default(),
            panel: PanelConfig::default(),
        }
    }
}

/// Outside-dismiss configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DismissConfig {
    /// How long an overlay pointer-down suppresses dismissal (default: 500)
    #[serde(default = "default_suppression_ms")]
    pub suppression_ms: u64,

    /// Delay before the guard starts listening after the panel opens (default: 100)
    #[serde(default = "default_listener_delay_ms")]
    pub listener_delay_ms: u64,

    /// Class names identifying floating overlays owned by panel controls
    #[serde(default = "default_overlay_classes")]
    pub overlay_classes: Vec<String>,
}

fn default_suppression_ms() -> u64 {
    500
}

fn default_listener_delay_ms() -> u64 {
    100
}

fn default_overlay_classes() -> Vec<String> {
    [
        "dropdown",
        "select-dropdown",
        "popconfirm",
        "popover",
        "picker-dropdown",
        "tree-select-dropdown",
        "menu",
        "modal",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for DismissConfig {
    fn default() -> Self {
        Self {
            suppression_ms: default_suppression_ms(),
            listener_delay_ms: default_listener_delay_ms(),
            overlay_classes: default_overlay_classes(),
        }
    }
}

impl DismissConfig {
    pub fn suppression(&self) -> Duration {
        Duration::from_millis(self.suppression_ms)
    }

    pub fn listener_delay(&self) -> Duration {
        Duration::from_millis(self.listener_delay_ms)
    }
}

/// Detail panel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Compressed width in pixels (default: 1000)
    #[serde(default = "default_panel_width")]
    pub width: u32,

    /// Expanded width as a share of the viewport (default: 90)
    #[serde(default = "default_expanded_percent")]
    pub expanded_percent: u8,
}

fn default_panel_width() -> u32 {
    1000
}

fn default_expanded_percent() -> u8 {
    90
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: default_panel_width(),
            expanded_percent: default_expanded_percent(),
        }
    }
}

impl Config {
    /// Resolve the config file path.
    ///
    /// `SPRINTDESK_CONFIG` wins; otherwise `.sprintdesk/config.yaml` in the
    /// working directory if present, else the per-user config directory.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }

        let local = PathBuf::from(DESK_DIR).join("config.yaml");
        if local.exists() {
            return local;
        }

        ProjectDirs::from("", "", "sprintdesk")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .unwrap_or(local)
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            DeskError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let mut config: Config = serde_yaml_ng::from_str(&content)?;
        config.normalize();
        Ok(config)
    }

    /// Save configuration to the resolved path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                DeskError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).map_err(|e| {
            DeskError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;
        Ok(())
    }

    fn normalize(&mut self) {
        self.page_size = self.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
        self.panel.expanded_percent = self.panel.expanded_percent.clamp(1, 100);
    }

    /// Set the page size, clamped to the range the store accepts.
    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
    }

    /// Set a value by dotted key, as used by `config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || DeskError::Config(format!("invalid value '{value}' for '{key}'"));
        match key {
            "page_size" => self.set_page_size(value.parse().map_err(|_| invalid())?),
            "dismiss.suppression_ms" => {
                self.dismiss.suppression_ms = value.parse().map_err(|_| invalid())?
            }
            "dismiss.listener_delay_ms" => {
                self.dismiss.listener_delay_ms = value.parse().map_err(|_| invalid())?
            }
            "dismiss.overlay_classes" => {
                self.dismiss.overlay_classes = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            }
            "panel.width" => self.panel.width = value.parse().map_err(|_| invalid())?,
            "panel.expanded_percent" => {
                let percent: u8 = value.parse().map_err(|_| invalid())?;
                if !(1..=100).contains(&percent) {
                    return Err(invalid());
                }
                self.panel.expanded_percent = percent;
            }
            _ => return Err(DeskError::Config(format!("unknown config key '{key}'"))),
        }
        Ok(())
    }
}
