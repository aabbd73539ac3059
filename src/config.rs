//! Application configuration
//!
//! Settings are read from an optional `config.json` in the app config
//! directory. Every field has a default, so a partial file is fine.

use crate::recorder::sink::{FourCc, InvalidFourCc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the config file inside the app config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Directory created under the system video directory
const DEFAULT_OUTPUT_SUBDIR: &str = "hand-recorder";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] InvalidFourCc),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// External landmark model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// Executable to run
    pub command: String,

    /// Arguments placed before the model options
    pub args: Vec<String>,

    pub max_hands: u32,

    /// 0 = lite, 1 = full
    pub model_complexity: u8,

    pub min_detection_confidence: f32,

    pub min_tracking_confidence: f32,

    /// How long a tick waits for the model's answer
    pub response_timeout_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            max_hands: 2,
            model_complexity: 0,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            response_timeout_ms: 200,
        }
    }
}

impl DetectorConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Top-level application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Camera to open
    pub device_index: u32,

    /// Capture size to request; the camera may pick something else
    pub requested_width: u32,
    pub requested_height: u32,

    /// Period of the capture tick
    pub tick_interval_ms: u64,

    /// Frame rate declared in the output file
    pub frame_rate: f64,

    /// FourCC of the output codec
    pub codec: String,

    /// Where recordings go (defaults to the system video directory)
    pub output_dir: Option<PathBuf>,

    /// Output file name inside `output_dir`
    pub file_name: String,

    /// Keep the preview running while not recording
    pub preview_while_idle: bool,

    /// Mirror the image left to right
    pub mirror: bool,

    /// Landmark model; `None` disables the overlay
    pub detector: Option<DetectorConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_index: 1,
            requested_width: 800,
            requested_height: 800,
            tick_interval_ms: 20,
            frame_rate: 20.0,
            codec: "XVID".to_string(),
            output_dir: None,
            file_name: "output.avi".to_string(),
            preview_while_idle: true,
            mirror: true,
            detector: None,
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tickIntervalMs must be positive".to_string()));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::Invalid("frameRate must be positive".to_string()));
        }
        if self.requested_width == 0 || self.requested_height == 0 {
            return Err(ConfigError::Invalid("requested size must be non-zero".to_string()));
        }
        if self.file_name.is_empty() || self.file_name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "fileName must be a plain file name, got {:?}",
                self.file_name
            )));
        }
        if let Some(detector) = &self.detector {
            if detector.command.is_empty() {
                return Err(ConfigError::Invalid("detector.command is empty".to_string()));
            }
            if detector.response_timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "detector.responseTimeoutMs must be positive".to_string(),
                ));
            }
        }
        self.codec()?;
        Ok(())
    }

    pub fn codec(&self) -> Result<FourCc, ConfigError> {
        Ok(self.codec.parse()?)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Configured output directory, or `<video_dir>/hand-recorder`
    pub fn resolve_output_dir(&self, video_dir: Option<PathBuf>) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        match video_dir {
            Some(dir) => dir.join(DEFAULT_OUTPUT_SUBDIR),
            None => PathBuf::from("videos"),
        }
    }
}
