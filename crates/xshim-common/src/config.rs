//! Window and shim configuration

use crate::error::{ConfigError, ConfigResult};
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Geometry and behavior of a window created by the shim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Written to `WM_NAME`
    pub title: String,

    pub width: u32,

    pub height: u32,

    /// Honor the window manager's delete-window request
    pub closable: bool,

    /// Map the window right after creation
    pub visible: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "xshim".to_string(),
            width: 1280,
            height: 720,
            closable: true,
            visible: true,
        }
    }
}

impl WindowConfig {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Default::default()
        }
    }

    pub fn closable(mut self, closable: bool) -> Self {
        self.closable = closable;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// X11 carries window sizes as 16-bit values and rejects empty windows.
    pub fn validate(&self) -> ConfigResult<()> {
        let max = u32::from(u16::MAX);
        if self.width == 0 || self.height == 0 || self.width > max || self.height > max {
            return Err(ConfigError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    pub window: WindowConfig,
    pub logging: LogConfig,
}

impl ShimConfig {
    /// `$XDG_CONFIG_HOME/xshim/config.json`, or `./xshim/config.json` when no
    /// config directory is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("xshim")
            .join("config.json")
    }

    /// Load and validate a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_json(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate config from a JSON string.
    pub fn from_json(contents: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.window.validate()?;
        Ok(config)
    }
}
