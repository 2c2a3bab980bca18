//! Frame-rate and resolution normalizer.

use std::path::{Path, PathBuf};

use cutline_common::error::CutlineResult;
use cutline_media_model::{FrameRate, MediaStreamInfo, Resolution};
use serde::Serialize;

use crate::backend::{path_arg, AudioLayout, EncodePreset};
use crate::{ensure_exists, ensure_parent, MediaEngine};

/// Clips within this many frames per second of the target are not resampled.
pub const PASSTHROUGH_TOLERANCE_FPS: f64 = 0.5;

/// What to do with the clip's audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioHandling {
    /// Re-encode existing audio; a clip without audio gets none.
    Reencode,
    /// Drop all audio.
    Drop,
    /// Re-encode to this layout, or synthesize silence when the clip has none.
    EnsureTrack(AudioLayout),
}

/// Normalization target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    pub target_rate: FrameRate,
    pub target_resolution: Option<Resolution>,
    pub audio: AudioHandling,
    pub preset: EncodePreset,
}

impl NormalizeOptions {
    pub fn new(target_rate: FrameRate) -> Self {
        Self {
            target_rate,
            target_resolution: None,
            audio: AudioHandling::Reencode,
            preset: EncodePreset::Standard,
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.target_resolution = Some(resolution);
        self
    }

    pub fn with_audio(mut self, audio: AudioHandling) -> Self {
        self.audio = audio;
        self
    }

    /// Encode with `preset`, e.g. to match segments it will be joined with.
    pub fn with_preset(mut self, preset: EncodePreset) -> Self {
        self.preset = preset;
        self
    }
}

/// Result of a normalization.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizeReport {
    pub output: PathBuf,
    /// The clip was byte-copied instead of re-encoded.
    pub passthrough: bool,
}

impl MediaEngine {
    /// Resample `clip` to the target frame rate and, optionally, letterbox
    /// it to the target resolution.
    pub fn normalize(
        &self,
        clip: &Path,
        output: &Path,
        options: &NormalizeOptions,
    ) -> CutlineResult<NormalizeReport> {
        ensure_exists(clip)?;
        ensure_parent(output)?;
        let current = self.inspect(clip)?;

        if is_passthrough(&current, options) {
            tracing::info!(
                clip = %clip.display(),
                current = %current.frame_rate,
                target = %options.target_rate,
                "Clip already at target rate; copying"
            );
            std::fs::copy(clip, output)?;
            return Ok(NormalizeReport {
                output: output.to_path_buf(),
                passthrough: true,
            });
        }

        let args = self.normalize_args(clip, output, &current, options);
        tracing::info!(
            clip = %clip.display(),
            from_rate = %current.frame_rate,
            to_rate = %options.target_rate,
            resolution = ?options.target_resolution,
            "Normalizing clip"
        );
        self.backend().run_ffmpeg(&args)?;

        Ok(NormalizeReport {
            output: output.to_path_buf(),
            passthrough: false,
        })
    }

    fn normalize_args(
        &self,
        clip: &Path,
        output: &Path,
        current: &MediaStreamInfo,
        options: &NormalizeOptions,
    ) -> Vec<String> {
        let mut args = vec!["-i".to_string(), path_arg(clip)];

        let silent = match options.audio {
            AudioHandling::EnsureTrack(layout) if !current.has_audio => Some(layout),
            _ => None,
        };
        if let Some(layout) = silent {
            args.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!(
                    "anullsrc=channel_layout={}:sample_rate={}",
                    layout.channel_layout(),
                    layout.sample_rate
                ),
            ]);
        }

        args.extend([
            "-vf".to_string(),
            video_filter(options.target_rate, options.target_resolution),
            "-map".to_string(),
            "0:v:0".to_string(),
        ]);
        args.extend(self.encode_settings().video_args(options.preset));

        match options.audio {
            AudioHandling::Drop => args.push("-an".to_string()),
            AudioHandling::Reencode if current.has_audio => {
                args.extend(["-map".to_string(), "0:a:0".to_string()]);
                args.extend(self.encode_settings().audio_args(None));
            }
            AudioHandling::Reencode => args.push("-an".to_string()),
            AudioHandling::EnsureTrack(layout) => {
                let source = if current.has_audio { "0:a:0" } else { "1:a:0" };
                args.extend(["-map".to_string(), source.to_string()]);
                args.extend(self.encode_settings().audio_args(Some(layout)));
                if !current.has_audio {
                    args.push("-shortest".to_string());
                }
            }
        }

        args.push(path_arg(output));
        args
    }
}

/// Whether the clip can be copied unchanged.
pub fn is_passthrough(current: &MediaStreamInfo, options: &NormalizeOptions) -> bool {
    options.target_resolution.is_none()
        && options.audio == AudioHandling::Reencode
        && current
            .frame_rate
            .is_close_to(&options.target_rate, PASSTHROUGH_TOLERANCE_FPS)
}

/// Frame-rate resampling, plus aspect-preserving scale and centered padding
/// when a resolution is requested.
pub fn video_filter(rate: FrameRate, resolution: Option<Resolution>) -> String {
    let fps = format!("fps={}", rate.to_filter_arg());
    match resolution {
        Some(res) => format!(
            "{fps},scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
            w = res.width,
            h = res.height
        ),
        None => fps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine, probe_doc, RecordingBackend};
    use std::sync::Arc;

    fn ntsc() -> FrameRate {
        FrameRate::new(30000, 1001).unwrap()
    }

    #[test]
    fn test_letterbox_filter() {
        assert_eq!(
            video_filter(ntsc(), Some(Resolution::new(1280, 720))),
            "fps=30000/1001,scale=1280:720:force_original_aspect_ratio=decrease,\
             pad=1280:720:(ow-iw)/2:(oh-ih)/2,setsar=1"
        );
        assert_eq!(
            video_filter(FrameRate::integer(25).unwrap(), None),
            "fps=25/1"
        );
    }

    #[test]
    fn test_near_rate_without_resolution_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"original bytes").unwrap();
        let backend = Arc::new(RecordingBackend::with_default_probe(probe_doc(
            640, 360, "30/1", Some(90), 3.0, true,
        )));
        let engine = engine(backend.clone(), dir.path());

        let out = dir.path().join("out.mp4");
        let report = engine
            .normalize(&clip, &out, &NormalizeOptions::new(ntsc()))
            .unwrap();

        assert!(report.passthrough);
        assert_eq!(std::fs::read(&out).unwrap(), b"original bytes");
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_resolution_request_forces_reencode() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"x").unwrap();
        let backend = Arc::new(RecordingBackend::with_default_probe(probe_doc(
            1920, 1080, "30/1", Some(90), 3.0, true,
        )));
        let engine = engine(backend.clone(), dir.path());

        let out = dir.path().join("out.mp4");
        let options = NormalizeOptions::new(ntsc()).with_resolution(Resolution::new(1280, 720));
        let report = engine.normalize(&clip, &out, &options).unwrap();

        assert!(!report.passthrough);
        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        let args = &calls[0];
        assert!(args.iter().any(|a| a.starts_with("fps=30000/1001,scale=1280:720")));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a:0"));
        assert_eq!(args.last().unwrap(), &out.to_string_lossy());
    }

    #[test]
    fn test_silent_track_synthesized_when_required() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"x").unwrap();
        let backend = Arc::new(RecordingBackend::with_default_probe(probe_doc(
            640, 360, "24/1", Some(48), 2.0, false,
        )));
        let engine = engine(backend.clone(), dir.path());

        let layout = AudioLayout {
            sample_rate: 48000,
            channels: 2,
        };
        let options = NormalizeOptions::new(ntsc()).with_audio(AudioHandling::EnsureTrack(layout));
        engine
            .normalize(&clip, &dir.path().join("out.mp4"), &options)
            .unwrap();

        let args = &backend.calls()[0];
        assert!(args
            .iter()
            .any(|a| a == "anullsrc=channel_layout=stereo:sample_rate=48000"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a:0"));
        assert!(args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_drop_audio() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"x").unwrap();
        let backend = Arc::new(RecordingBackend::with_default_probe(probe_doc(
            640, 360, "24/1", Some(48), 2.0, true,
        )));
        let engine = engine(backend.clone(), dir.path());

        let options = NormalizeOptions::new(ntsc()).with_audio(AudioHandling::Drop);
        engine
            .normalize(&clip, &dir.path().join("out.mp4"), &options)
            .unwrap();

        let args = &backend.calls()[0];
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.iter().any(|a| a == "0:a:0"));
    }

    #[test]
    fn test_missing_clip_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::default());
        let engine = engine(backend, dir.path());
        let err = engine
            .normalize(
                &dir.path().join("absent.mp4"),
                &dir.path().join("out.mp4"),
                &NormalizeOptions::new(ntsc()),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            cutline_common::error::CutlineError::FileNotFound { .. }
        ));
    }
}
