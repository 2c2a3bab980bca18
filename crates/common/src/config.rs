//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CutlineError, CutlineResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// External media tool locations.
    pub backend: BackendConfig,

    /// Encoder settings shared by every re-encode.
    pub encode: EncodeConfig,

    /// Region tracker tuning.
    pub tracking: TrackingConfig,

    /// Parent directory for scoped temporary directories.
    /// `None` uses the system temp dir.
    pub work_dir: Option<PathBuf>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Media backend binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

/// Encoder parameters.
///
/// All segments of one splice are encoded with the same values so the
/// final concatenation can stream-copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    pub video_codec: String,
    pub crf: u32,
    pub preset: String,
    /// Preset for before/after cuts of a splice.
    pub segment_preset: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

/// Region tracker parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Long-edge threshold above which frames are downscaled for tracking.
    pub max_track_dim: u32,

    /// Upper bound on sampled path points per finding.
    pub target_points: u64,

    /// Minimum normalized correlation to accept a tracker update.
    pub min_confidence: f64,

    /// Search window margin around the last box, in box sizes.
    pub search_margin: f64,

    /// Appearance template blend factor per accepted update.
    pub template_learning_rate: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "cutline=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            crf: 18,
            preset: "fast".to_string(),
            segment_preset: "ultrafast".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_track_dim: 640,
            target_points: 100,
            min_confidence: 0.45,
            search_margin: 1.0,
            template_learning_rate: 0.1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit file.
    pub fn load_from(path: &Path) -> CutlineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CutlineError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| CutlineError::Config {
            message: format!("cannot parse {}: {e}", path.display()),
        })
    }

    /// Save config to the standard location.
    pub fn save(&self) -> CutlineResult<PathBuf> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> CutlineResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| CutlineError::Config {
            message: format!("cannot serialize config: {e}"),
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Directory under which scoped temporary directories are created.
    pub fn scratch_root(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cutline").join("config.json")
}
