//! Media-processing backend.
//!
//! The backend is an out-of-process tool: argument lists in, files out.
//! A non-zero exit status with the captured diagnostic text is the only
//! error signal.

use std::path::Path;
use std::process::{Command, Stdio};

use cutline_common::config::{BackendConfig, EncodeConfig};
use cutline_common::error::{CutlineError, CutlineResult};

/// Trait for media backends (ffmpeg CLI, test doubles).
pub trait MediaBackend: Send + Sync {
    /// Run the transcoder with `args`. Global flags are added by the backend.
    fn run_ffmpeg(&self, args: &[String]) -> CutlineResult<()>;

    /// Probe a container and return the prober's JSON document.
    fn probe_json(&self, path: &Path) -> CutlineResult<serde_json::Value>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// ffmpeg/ffprobe command-line backend.
#[derive(Debug, Clone)]
pub struct FfmpegCli {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegCli {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
        }
    }
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new(&BackendConfig::default())
    }
}

impl MediaBackend for FfmpegCli {
    fn run_ffmpeg(&self, args: &[String]) -> CutlineResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let start = std::time::Instant::now();

        let output = Command::new(&self.ffmpeg)
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CutlineError::Backend {
                program: self.ffmpeg.clone(),
                status: "not started".to_string(),
                diagnostics: e.to_string(),
            })?;

        if !output.status.success() {
            let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(status = %output.status, %diagnostics, "ffmpeg failed");
            return Err(CutlineError::Backend {
                program: self.ffmpeg.clone(),
                status: output.status.to_string(),
                diagnostics,
            });
        }

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            args_len = args.len(),
            "ffmpeg completed"
        );
        Ok(())
    }

    fn probe_json(&self, path: &Path) -> CutlineResult<serde_json::Value> {
        if !path.exists() {
            return Err(CutlineError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        tracing::debug!(path = %path.display(), "Running ffprobe");
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CutlineError::Backend {
                program: self.ffprobe.clone(),
                status: "not started".to_string(),
                diagnostics: e.to_string(),
            })?;

        if !output.status.success() {
            let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CutlineError::unreadable(
                path,
                format!("ffprobe exited with {}: {diagnostics}", output.status),
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| CutlineError::unreadable(path, format!("invalid ffprobe output: {e}")))
    }

    fn is_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|binary| {
            Command::new(binary)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    fn name(&self) -> &str {
        "ffmpeg-cli"
    }
}

/// Which configured x264 preset an encode uses.
///
/// Segments joined by a stream-copy concat must share one preset: presets
/// change the H.264 profile and entropy coder, and the joined file keeps
/// only the first segment's parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodePreset {
    #[default]
    Standard,
    Segment,
}

/// Shared encoder arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub crf: u32,
    pub preset: String,
    pub segment_preset: String,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

/// mp4 track timescale shared by every encoded segment.
pub const TRACK_TIMESCALE: u32 = 90_000;

impl EncodeSettings {
    pub fn from_config(config: &EncodeConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            crf: config.crf,
            preset: config.preset.clone(),
            segment_preset: config.segment_preset.clone(),
            pixel_format: config.pixel_format.clone(),
            audio_codec: config.audio_codec.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
        }
    }

    /// Video encoder arguments for `preset`.
    pub fn video_args(&self, preset: EncodePreset) -> Vec<String> {
        let preset = match preset {
            EncodePreset::Standard => &self.preset,
            EncodePreset::Segment => &self.segment_preset,
        };
        vec![
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            preset.to_string(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-video_track_timescale".to_string(),
            TRACK_TIMESCALE.to_string(),
        ]
    }

    /// Audio encoder arguments, optionally forcing a sample layout.
    pub fn audio_args(&self, layout: Option<AudioLayout>) -> Vec<String> {
        let mut args = vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ];
        if let Some(layout) = layout {
            args.extend([
                "-ar".to_string(),
                layout.sample_rate.to_string(),
                "-ac".to_string(),
                layout.channels.to_string(),
            ]);
        }
        args
    }
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from_config(&EncodeConfig::default())
    }
}

/// Audio sample layout shared by spliced segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioLayout {
    pub sample_rate: u32,
    pub channels: u32,
}

impl AudioLayout {
    /// `anullsrc` channel layout name.
    pub fn channel_layout(&self) -> String {
        match self.channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            n => format!("{n}c"),
        }
    }
}

/// Convert a path to a backend argument.
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_args_use_fast_preset() {
        let settings = EncodeSettings::default();
        let args = settings.video_args(EncodePreset::Segment);
        let preset = args.iter().position(|a| a == "-preset").unwrap();
        assert_eq!(args[preset + 1], "ultrafast");
        let standard = settings.video_args(EncodePreset::Standard);
        assert_eq!(standard[preset + 1], "fast");
        assert!(args.contains(&"yuv420p".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_audio_layout_args() {
        let settings = EncodeSettings::default();
        let args = settings.audio_args(Some(AudioLayout {
            sample_rate: 48000,
            channels: 2,
        }));
        assert_eq!(
            args,
            ["-c:a", "aac", "-b:a", "192k", "-ar", "48000", "-ac", "2"]
        );
    }

    #[test]
    fn test_channel_layout_names() {
        let mono = AudioLayout {
            sample_rate: 44100,
            channels: 1,
        };
        assert_eq!(mono.channel_layout(), "mono");
        let six = AudioLayout {
            sample_rate: 48000,
            channels: 6,
        };
        assert_eq!(six.channel_layout(), "6c");
    }

    #[test]
    fn test_missing_binary_is_backend_failure() {
        let backend = FfmpegCli::new(&BackendConfig {
            ffmpeg_path: "/nonexistent/cutline-ffmpeg".to_string(),
            ffprobe_path: "/nonexistent/cutline-ffprobe".to_string(),
        });
        assert!(!backend.is_available());
        let err = backend.run_ffmpeg(&["-version".to_string()]).unwrap_err();
        assert!(matches!(err, CutlineError::Backend { .. }));
    }
}
