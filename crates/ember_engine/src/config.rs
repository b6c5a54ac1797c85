//! Configuration system

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration trait
///
/// Any serializable struct with sensible defaults can act as a configuration
/// section loaded from a TOML file.
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if !path.ends_with(".toml") {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        }
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        if !path.ends_with(".toml") {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        }
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Load configuration from file when it exists, falling back to defaults.
    ///
    /// A missing file is expected (the defaults are the shipped configuration);
    /// a file that fails to parse is reported and ignored.
    fn load_or_default(path: &str) -> Self {
        if !Path::new(path).exists() {
            return Self::default();
        }
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("failed to load {path}: {e}; using defaults");
                Self::default()
            }
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,

    /// Window width in pixels
    pub width: u32,

    /// Window height in pixels
    pub height: u32,

    /// MSAA sample count for the default framebuffer
    pub samples: u32,

    /// Whether the window is resizable
    pub resizable: bool,

    /// Whether the window has decorations (title bar, borders)
    pub decorated: bool,

    /// VSync setting
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Ember Application".to_string(),
            width: 1280,
            height: 720,
            samples: 0,
            resizable: false,
            decorated: false,
            vsync: true,
        }
    }
}

impl Config for WindowConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo_window() {
        let config = WindowConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.samples, 0);
        assert!(!config.resizable);
        assert!(!config.decorated);
        assert!(config.vsync);
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: WindowConfig = toml::from_str("width = 640\nheight = 480\n").unwrap();
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.title, WindowConfig::default().title);
        assert!(config.vsync);
    }

    #[test]
    fn save_and_load_round_trip() {
        let path = std::env::temp_dir().join("ember_window_config_test.toml");
        let path = path.to_str().unwrap().to_string();

        let mut config = WindowConfig::default();
        config.title = "Round Trip".to_string();
        config.width = 800;
        config.save_to_file(&path).unwrap();

        let loaded = WindowConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.title, "Round Trip");
        assert_eq!(loaded.width, 800);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn non_toml_paths_are_rejected() {
        let result = WindowConfig::load_from_file("window.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn load_or_default_tolerates_a_missing_file() {
        let config = WindowConfig::load_or_default("does-not-exist.toml");
        assert_eq!(config.width, 1280);
    }
}
