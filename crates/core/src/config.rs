//! Application configuration.
//!
//! Configuration is stored as TOML. Every field has a default, so an empty
//! file (or no file at all) yields a runnable setup:
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//!
//! [frames]
//! frames_in_flight = 3
//!
//! [graphics]
//! prefer_mailbox = false
//! clear_color = [0.1, 0.1, 0.15, 1.0]
//!
//! [logging]
//! filter = "info,vkframe_renderer=trace"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the config file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vkframe.toml";

/// Upper bound accepted for `frames.frames_in_flight`.
pub const MAX_FRAMES_IN_FLIGHT: usize = 4;

/// Upper bound accepted for `frames.stats_interval_secs`.
pub const MAX_STATS_INTERVAL_SECS: f32 = 3600.0;

/// Configuration errors.
#[derive(Error, Debug)]
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

    /// Semantically invalid value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A TOML-backed configuration document.
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a TOML file.
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string.
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "vkframe".to_string(),
            resizable: true,
        }
    }
}

/// Frame pacing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Number of frame slots (N). Bounds how far the CPU may run ahead of the GPU.
    pub frames_in_flight: usize,
    /// Seconds between frame-rate reports.
    pub stats_interval_secs: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            stats_interval_secs: 2.0,
        }
    }
}

/// GPU-facing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Enable the Khronos validation layer. Defaults to on in debug builds.
    pub validation: Option<bool>,
    /// Use MAILBOX presentation when the surface offers it.
    pub prefer_mailbox: bool,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub clear_color: [f32; 4],
}

impl GraphicsConfig {
    /// Resolved validation flag.
    pub fn validation_enabled(&self) -> bool {
        self.validation.unwrap_or(cfg!(debug_assertions))
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            validation: None,
            prefer_mailbox: true,
            vertex_shader: PathBuf::from("shaders_spv/vert.spv"),
            fragment_shader: PathBuf::from("shaders_spv/frag.spv"),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: Option<String>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub frames: FrameConfig,
    pub graphics: GraphicsConfig,
    pub logging: LoggingConfig,
}

impl Config for AppConfig {}

impl AppConfig {
    /// Resolve the configuration the way the binary does.
    ///
    /// An explicit path must exist and parse. Without one, [`DEFAULT_CONFIG_FILE`]
    /// is read when present and defaults are used otherwise.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load_from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the renderer cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.frames.frames_in_flight;
        if n == 0 || n > MAX_FRAMES_IN_FLIGHT {
            return Err(ConfigError::Invalid(format!(
                "frames.frames_in_flight must be within 1..={}, got {}",
                MAX_FRAMES_IN_FLIGHT, n
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        let interval = self.frames.stats_interval_secs;
        if !interval.is_finite() || interval <= 0.0 || interval > MAX_STATS_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "frames.stats_interval_secs must be within (0, {}], got {}",
                MAX_STATS_INTERVAL_SECS, interval
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frames.frames_in_flight, 2);
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert!(config.graphics.prefer_mailbox);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [frames]
            frames_in_flight = 3

            [graphics]
            clear_color = [0.1, 0.2, 0.3, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.frames.frames_in_flight, 3);
        assert_eq!(config.graphics.clear_color, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(
            config.graphics.vertex_shader,
            PathBuf::from("shaders_spv/vert.spv")
        );
    }

    #[test]
    fn test_zero_frames_in_flight_rejected() {
        let mut config = AppConfig::default();
        config.frames.frames_in_flight = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_too_many_frames_in_flight_rejected() {
        let mut config = AppConfig::default();
        config.frames.frames_in_flight = MAX_FRAMES_IN_FLIGHT + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = AppConfig::default();
        config.window.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_stats_interval_rejected() {
        let config = AppConfig::from_toml_str("[frames]\nstats_interval_secs = inf\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = AppConfig::from_toml_str("[frames]\nstats_interval_secs = nan\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_huge_stats_interval_rejected() {
        let config = AppConfig::from_toml_str("[frames]\nstats_interval_secs = 1e30\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_accepted_stats_interval_builds_duration() {
        let mut config = AppConfig::default();
        config.frames.stats_interval_secs = MAX_STATS_INTERVAL_SECS;
        assert!(config.validate().is_ok());
        assert!(
            std::time::Duration::try_from_secs_f32(config.frames.stats_interval_secs).is_ok()
        );
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = AppConfig::from_toml_str("[frames\nframes_in_flight = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vkframe.toml");

        let mut config = AppConfig::default();
        config.window.title = "saved".to_string();
        config.graphics.validation = Some(false);
        config.logging.filter = Some("warn".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.graphics.validation_enabled());
    }

    #[test]
    fn test_discover_explicit_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let result = AppConfig::discover(Some(&missing));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_discover_validates_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[frames]\nframes_in_flight = 9\n").unwrap();

        let result = AppConfig::discover(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
