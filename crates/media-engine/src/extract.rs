//! Clip Extractor.
//!
//! Cuts are expressed in frame indices through `trim`/`atrim` filters and
//! re-encoded, so they land on exact frame boundaries instead of the
//! nearest keyframe.

use std::path::{Path, PathBuf};

use cutline_common::error::{CutlineError, CutlineResult};
use cutline_media_model::{
    BoundingBox, FrameRange, FrameRate, MediaStreamInfo, PixelRect, Resolution, TimeRange,
};
use serde::Serialize;

use crate::backend::{path_arg, AudioLayout, EncodePreset};
use crate::{ensure_exists, ensure_parent, MediaEngine};

/// Numbered frame image pattern, zero-padded so lexical order is temporal.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// A standalone sub-clip.
#[derive(Debug, Clone, Serialize)]
pub struct ClipReport {
    pub output: PathBuf,
    pub frame_range: FrameRange,
    pub frame_count: u64,
    pub duration_secs: f64,
}

/// A single extracted frame.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedFrame {
    pub output: PathBuf,
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub crop: Option<PixelRect>,
}

impl MediaEngine {
    /// Extract the inclusive frame range covered by `time_range`, widened
    /// by `buffer_secs`, as a standalone clip.
    ///
    /// Uses the same range arithmetic as splicing, so a replacement built
    /// from this clip re-inserts without duplicated or missing frames.
    pub fn extract_clip(
        &self,
        source: &Path,
        time_range: TimeRange,
        buffer_secs: f64,
        output: &Path,
    ) -> CutlineResult<ClipReport> {
        ensure_exists(source)?;
        ensure_parent(output)?;
        let info = self.inspect(source)?;
        let range = self.resolve_range(&info, time_range, buffer_secs)?;

        tracing::info!(
            source = %source.display(),
            start_frame = range.start_frame,
            end_frame = range.end_frame,
            "Extracting clip"
        );

        let video_args = self.encode_settings().video_args(EncodePreset::Standard);
        self.cut_segment(
            source,
            &info,
            (range.start_frame, range.end_frame + 1),
            audio_layout(&info),
            &video_args,
            output,
        )
        .map_err(|e| CutlineError::extract(e.to_string()))?;

        Ok(ClipReport {
            output: output.to_path_buf(),
            frame_range: range,
            frame_count: range.len(),
            duration_secs: info.frame_rate.duration_of(range.len()),
        })
    }

    /// Extract the frame containing `timestamp_secs` as an image, optionally
    /// cropped to a percentage box.
    pub fn extract_frame(
        &self,
        source: &Path,
        timestamp_secs: f64,
        crop: Option<BoundingBox>,
        output: &Path,
    ) -> CutlineResult<ExtractedFrame> {
        ensure_exists(source)?;
        ensure_parent(output)?;
        let info = self.inspect(source)?;

        if !timestamp_secs.is_finite() || timestamp_secs < 0.0 {
            return Err(CutlineError::invalid_range(format!(
                "timestamp {timestamp_secs}s is not a valid position"
            )));
        }
        let frame = info.frame_rate.frame_at(timestamp_secs);
        if frame >= info.total_frames {
            return Err(CutlineError::invalid_range(format!(
                "timestamp {timestamp_secs:.3}s (frame {frame}) is beyond the last frame {}",
                info.total_frames.saturating_sub(1)
            )));
        }

        let rect = crop.map(|b| crop_rect(&b, info.width, info.height));
        let mut filter = format!("select=eq(n\\,{frame})");
        if let Some(rect) = rect {
            filter.push(',');
            filter.push_str(&rect.to_crop_filter());
        }

        let args = vec![
            "-i".to_string(),
            path_arg(source),
            "-vf".to_string(),
            filter,
            "-frames:v".to_string(),
            "1".to_string(),
            "-update".to_string(),
            "1".to_string(),
            path_arg(output),
        ];
        self.backend()
            .run_ffmpeg(&args)
            .map_err(|e| CutlineError::extract(e.to_string()))?;

        let (width, height) = rect
            .map(|r| (r.width, r.height))
            .unwrap_or((info.width, info.height));
        tracing::info!(frame, width, height, output = %output.display(), "Extracted frame");

        Ok(ExtractedFrame {
            output: output.to_path_buf(),
            frame,
            width,
            height,
            crop: rect,
        })
    }

    /// Decode a numbered frame sequence into `output_dir`.
    ///
    /// `rate` defaults to the source's own frame rate, so frame `i` of the
    /// sequence is frame `i` of the source (offset by `start_secs`).
    pub fn extract_frames(
        &self,
        source: &Path,
        output_dir: &Path,
        rate: Option<FrameRate>,
        start_secs: Option<f64>,
        duration_secs: Option<f64>,
    ) -> CutlineResult<Vec<PathBuf>> {
        ensure_exists(source)?;
        let info = self.inspect(source)?;
        let rate = rate.unwrap_or(info.frame_rate);

        std::fs::create_dir_all(output_dir)?;
        if !list_frames(output_dir)?.is_empty() {
            return Err(CutlineError::invalid_input(format!(
                "{} already contains frame images",
                output_dir.display()
            )));
        }

        let mut args = Vec::new();
        if let Some(start) = start_secs.filter(|s| *s > 0.0) {
            args.extend(["-ss".to_string(), format!("{start:.6}")]);
        }
        args.extend(["-i".to_string(), path_arg(source)]);
        if let Some(duration) = duration_secs {
            args.extend(["-t".to_string(), format!("{duration:.6}")]);
        }
        args.extend([
            "-vf".to_string(),
            format!("fps={}", rate.to_filter_arg()),
            "-start_number".to_string(),
            "0".to_string(),
            path_arg(&output_dir.join(FRAME_PATTERN)),
        ]);

        tracing::info!(
            source = %source.display(),
            rate = %rate,
            dir = %output_dir.display(),
            "Extracting frame sequence"
        );
        self.backend()
            .run_ffmpeg(&args)
            .map_err(|e| CutlineError::extract(e.to_string()))?;

        let frames = list_frames(output_dir)?;
        if frames.is_empty() {
            return Err(CutlineError::extract(format!(
                "no frames were written to {}",
                output_dir.display()
            )));
        }
        Ok(frames)
    }

    /// Stream-copy the audio track. `None` when the source has no audio.
    pub fn extract_audio(&self, source: &Path, output: &Path) -> CutlineResult<Option<PathBuf>> {
        ensure_exists(source)?;
        let info = self.inspect(source)?;
        if !info.has_audio {
            tracing::info!(source = %source.display(), "Source has no audio track");
            return Ok(None);
        }
        ensure_parent(output)?;

        let args = vec![
            "-i".to_string(),
            path_arg(source),
            "-vn".to_string(),
            "-map".to_string(),
            "0:a:0".to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            path_arg(output),
        ];
        self.backend()
            .run_ffmpeg(&args)
            .map_err(|e| CutlineError::extract(e.to_string()))?;
        Ok(Some(output.to_path_buf()))
    }

    /// Re-encode frames `[start, end)` of `source` on exact boundaries.
    pub(crate) fn cut_segment(
        &self,
        source: &Path,
        info: &MediaStreamInfo,
        (start, end): (u64, u64),
        audio: Option<AudioLayout>,
        video_args: &[String],
        output: &Path,
    ) -> CutlineResult<()> {
        let mut args = vec![
            "-i".to_string(),
            path_arg(source),
            "-vf".to_string(),
            trim_filter(start, end),
            "-map".to_string(),
            "0:v:0".to_string(),
        ];
        args.extend(video_args.iter().cloned());

        match audio {
            Some(layout) if info.has_audio => {
                args.extend([
                    "-af".to_string(),
                    atrim_filter(info.frame_rate, start, end),
                    "-map".to_string(),
                    "0:a:0".to_string(),
                ]);
                args.extend(self.encode_settings().audio_args(Some(layout)));
            }
            _ => args.push("-an".to_string()),
        }
        args.push(path_arg(output));

        tracing::debug!(start, end, output = %output.display(), "Cutting segment");
        self.backend().run_ffmpeg(&args)
    }
}

/// Percentage crop box to pixels, clamped so the rectangle stays inside
/// the frame and is at least one pixel wide and tall.
pub fn crop_rect(bbox: &BoundingBox, width: u32, height: u32) -> PixelRect {
    bbox.to_pixels(Resolution::new(width, height))
}

/// Frame-index trim for `[start, end)`.
pub fn trim_filter(start: u64, end: u64) -> String {
    format!("trim=start_frame={start}:end_frame={end},setpts=PTS-STARTPTS")
}

/// Audio trim matching `[start, end)` frames at `rate`.
pub fn atrim_filter(rate: FrameRate, start: u64, end: u64) -> String {
    format!(
        "atrim=start={:.6}:end={:.6},asetpts=PTS-STARTPTS",
        rate.seconds_at(start),
        rate.seconds_at(end)
    )
}

/// Audio layout to carry through cuts, when the source has audio.
pub(crate) fn audio_layout(info: &MediaStreamInfo) -> Option<AudioLayout> {
    info.has_audio.then(|| AudioLayout {
        sample_rate: info.audio_sample_rate.unwrap_or(48_000),
        channels: info.audio_channels.unwrap_or(2),
    })
}

/// `frame_*.png` files in `dir`, sorted.
pub fn list_frames(dir: &Path) -> CutlineResult<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("frame_") && n.ends_with(".png"))
            .unwrap_or(false);
        if is_frame {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine, probe_doc, RecordingBackend};
    use std::sync::Arc;

    fn setup(doc: serde_json::Value) -> (tempfile::TempDir, Arc<RecordingBackend>, MediaEngine, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mp4");
        std::fs::write(&source, b"x").unwrap();
        let backend = Arc::new(RecordingBackend::with_default_probe(doc));
        let engine = engine(backend.clone(), dir.path());
        (dir, backend, engine, source)
    }

    #[test]
    fn test_crop_of_1000x800_frame() {
        let bbox = BoundingBox::new(0.0, 0.0, 50.0, 50.0).unwrap();
        let rect = crop_rect(&bbox, 1000, 800);
        assert_eq!((rect.width, rect.height), (500, 400));
    }

    #[test]
    fn test_crop_is_clamped_to_frame() {
        let bbox = BoundingBox {
            top: 75.0,
            left: 75.0,
            width: 50.0,
            height: 50.0,
        };
        let rect = crop_rect(&bbox, 1000, 800);
        assert_eq!(rect.x + rect.width, 1000);
        assert_eq!(rect.y + rect.height, 800);
    }

    #[test]
    fn test_trim_filters_use_frame_boundaries() {
        assert_eq!(
            trim_filter(30, 60),
            "trim=start_frame=30:end_frame=60,setpts=PTS-STARTPTS"
        );
        let rate = FrameRate::new(30000, 1001).unwrap();
        assert_eq!(
            atrim_filter(rate, 30, 60),
            "atrim=start=1.001000:end=2.002000,asetpts=PTS-STARTPTS"
        );
    }

    #[test]
    fn test_extract_clip_uses_inclusive_range() {
        let (_dir, backend, engine, source) =
            setup(probe_doc(640, 360, "30/1", Some(300), 10.0, true));
        let out = source.with_file_name("clip.mp4");
        let report = engine
            .extract_clip(&source, TimeRange::new(1.0, 2.0).unwrap(), 0.0, &out)
            .unwrap();

        assert_eq!(report.frame_range, FrameRange::new(30, 60));
        assert_eq!(report.frame_count, 31);
        let args = &backend.calls()[0];
        assert!(args.contains(&"trim=start_frame=30:end_frame=61,setpts=PTS-STARTPTS".to_string()));
        assert!(args.iter().any(|a| a.starts_with("atrim=start=1.000000")));
    }

    #[test]
    fn test_extract_clip_buffer_is_clamped() {
        let (_dir, _backend, engine, source) =
            setup(probe_doc(640, 360, "30/1", Some(300), 10.0, false));
        let out = source.with_file_name("clip.mp4");
        let report = engine
            .extract_clip(&source, TimeRange::new(0.2, 9.9).unwrap(), 0.5, &out)
            .unwrap();
        assert_eq!(report.frame_range, FrameRange::new(0, 299));
    }

    #[test]
    fn test_extract_frame_selects_exact_frame_and_crops() {
        let (_dir, backend, engine, source) =
            setup(probe_doc(1000, 800, "25/1", Some(250), 10.0, false));
        let out = source.with_file_name("frame.png");
        let frame = engine
            .extract_frame(
                &source,
                2.0,
                Some(BoundingBox::new(0.0, 0.0, 50.0, 50.0).unwrap()),
                &out,
            )
            .unwrap();

        assert_eq!(frame.frame, 50);
        assert_eq!((frame.width, frame.height), (500, 400));
        let args = &backend.calls()[0];
        assert!(args.contains(&"select=eq(n\\,50),crop=500:400:0:0".to_string()));
    }

    #[test]
    fn test_extract_frame_past_end_is_invalid_range() {
        let (_dir, _backend, engine, source) =
            setup(probe_doc(640, 360, "25/1", Some(250), 10.0, false));
        let err = engine
            .extract_frame(&source, 10.0, None, &source.with_file_name("f.png"))
            .unwrap_err();
        assert!(matches!(err, CutlineError::InvalidRange { .. }));
    }

    #[test]
    fn test_extract_audio_absent_track() {
        let (_dir, backend, engine, source) =
            setup(probe_doc(640, 360, "25/1", Some(250), 10.0, false));
        let result = engine
            .extract_audio(&source, &source.with_file_name("a.m4a"))
            .unwrap();
        assert!(result.is_none());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_backend_failure_is_extract_error_with_diagnostics() {
        let (_dir, backend, engine, source) =
            setup(probe_doc(640, 360, "25/1", Some(250), 10.0, true));
        *backend.fail_when_arg_contains.lock().unwrap() = Some("-vn".to_string());
        let err = engine
            .extract_audio(&source, &source.with_file_name("a.m4a"))
            .unwrap_err();
        assert!(matches!(err, CutlineError::Extract { .. }));
        assert!(err.to_string().contains("simulated failure"));
    }
}
