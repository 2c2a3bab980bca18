//! Segment Splicer.
//!
//! A splice cuts the original into before/after segments on exact frame
//! boundaries, normalizes the replacement to the original's geometry and
//! rate, and stream-copies `[before?, replacement, after?]` into one file.
//! All intermediates live in a scoped temporary directory that is removed
//! on every exit path.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use cutline_common::error::{CutlineError, CutlineResult};
use cutline_media_model::{FrameRange, TimeRange};
use serde::Serialize;

use crate::backend::{path_arg, EncodePreset};
use crate::extract::audio_layout;
use crate::normalize::{AudioHandling, NormalizeOptions};
use crate::{ensure_exists, ensure_parent, MediaEngine};

/// Inputs to a splice.
#[derive(Debug, Clone)]
pub struct SpliceRequest {
    pub original: PathBuf,
    pub replacement: PathBuf,
    pub time_range: TimeRange,
    pub buffer_secs: f64,
    pub output: PathBuf,
}

/// Position of a segment in the stitched output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRole {
    Before,
    Replacement,
    After,
}

/// One segment of the stitched output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentInfo {
    pub role: SegmentRole,
    pub frame_count: u64,
    pub duration_secs: f64,
}

/// Outcome of a splice.
#[derive(Debug, Clone, Serialize)]
pub struct SpliceReport {
    pub output: PathBuf,
    /// Replaced region of the original, inclusive.
    pub frame_range: FrameRange,
    pub segments: Vec<SegmentInfo>,
    /// Sum of segment durations.
    pub expected_duration_secs: f64,
}

impl SpliceReport {
    pub fn total_frames(&self) -> u64 {
        self.segments.iter().map(|s| s.frame_count).sum()
    }

    pub fn segment(&self, role: SegmentRole) -> Option<&SegmentInfo> {
        self.segments.iter().find(|s| s.role == role)
    }
}

impl MediaEngine {
    /// Replace the frames covered by `request.time_range` with the
    /// replacement clip.
    pub fn splice_replace(&self, request: &SpliceRequest) -> CutlineResult<SpliceReport> {
        ensure_exists(&request.original)?;
        ensure_exists(&request.replacement)?;
        ensure_parent(&request.output)?;

        let info = self.inspect(&request.original)?;
        let range = self.resolve_range(&info, request.time_range, request.buffer_secs)?;
        let rate = info.frame_rate;
        let layout = audio_layout(&info);

        tracing::info!(
            original = %request.original.display(),
            replacement = %request.replacement.display(),
            start_frame = range.start_frame,
            end_frame = range.end_frame,
            total_frames = info.total_frames,
            "Splicing replacement"
        );

        let scratch = self.scratch_dir("cutline-splice-")?;
        let mut parts: Vec<PathBuf> = Vec::with_capacity(3);
        let mut segments = Vec::with_capacity(3);
        let segment_args = self.encode_settings().video_args(EncodePreset::Segment);

        if let Some((start, end)) = range.before() {
            let path = scratch.path().join("before.mp4");
            self.cut_segment(
                &request.original,
                &info,
                (start, end),
                layout,
                &segment_args,
                &path,
            )
            .map_err(CutlineError::into_splice)?;
            parts.push(path);
            segments.push(SegmentInfo {
                role: SegmentRole::Before,
                frame_count: end - start,
                duration_secs: rate.duration_of(end - start),
            });
        }

        let normalized = scratch.path().join("replacement.mp4");
        let audio = match layout {
            Some(layout) => AudioHandling::EnsureTrack(layout),
            None => AudioHandling::Drop,
        };
        let options = NormalizeOptions::new(rate)
            .with_resolution(info.resolution())
            .with_audio(audio)
            .with_preset(EncodePreset::Segment);
        self.normalize(&request.replacement, &normalized, &options)
            .map_err(CutlineError::into_splice)?;
        let replacement_frames = self
            .inspect(&normalized)
            .map_err(|e| CutlineError::splice(format!("normalized replacement unreadable: {e}")))?
            .total_frames;
        parts.push(normalized);
        segments.push(SegmentInfo {
            role: SegmentRole::Replacement,
            frame_count: replacement_frames,
            duration_secs: rate.duration_of(replacement_frames),
        });

        if let Some((start, end)) = range.after(info.total_frames) {
            let path = scratch.path().join("after.mp4");
            self.cut_segment(
                &request.original,
                &info,
                (start, end),
                layout,
                &segment_args,
                &path,
            )
            .map_err(CutlineError::into_splice)?;
            if is_nonempty_file(&path) {
                parts.push(path);
                segments.push(SegmentInfo {
                    role: SegmentRole::After,
                    frame_count: end - start,
                    duration_secs: rate.duration_of(end - start),
                });
            } else {
                tracing::warn!(start, end, "After segment produced no output; treating as absent");
            }
        }

        self.concat_parts(&parts, scratch.path(), &request.output)
            .map_err(CutlineError::into_splice)?;

        let expected_duration_secs = segments.iter().map(|s| s.duration_secs).sum();
        let report = SpliceReport {
            output: request.output.clone(),
            frame_range: range,
            segments,
            expected_duration_secs,
        };

        tracing::info!(
            output = %report.output.display(),
            segments = report.segments.len(),
            total_frames = report.total_frames(),
            expected_duration_secs,
            "Splice complete"
        );
        Ok(report)
    }

    /// Concatenate clips in order without re-encoding.
    ///
    /// A single clip is copied byte-for-byte. An empty list is invalid input.
    pub fn concat_clips(&self, clips: &[PathBuf], output: &Path) -> CutlineResult<PathBuf> {
        if clips.is_empty() {
            return Err(CutlineError::invalid_input("no clips to concatenate"));
        }
        for clip in clips {
            ensure_exists(clip)?;
        }
        ensure_parent(output)?;

        if let [single] = clips {
            tracing::info!(clip = %single.display(), "Single clip; copying");
            std::fs::copy(single, output)?;
            return Ok(output.to_path_buf());
        }

        let scratch = self.scratch_dir("cutline-concat-")?;
        self.concat_parts(clips, scratch.path(), output)?;
        Ok(output.to_path_buf())
    }

    fn concat_parts(&self, parts: &[PathBuf], scratch: &Path, output: &Path) -> CutlineResult<()> {
        let list_path = scratch.join("concat.txt");
        std::fs::write(&list_path, concat_list(parts)?)?;

        let args = vec![
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            path_arg(&list_path),
            "-c".to_string(),
            "copy".to_string(),
            path_arg(output),
        ];
        tracing::debug!(parts = parts.len(), "Concatenating segments");
        self.backend().run_ffmpeg(&args)
    }
}

/// Concat demuxer list with absolute, quote-escaped paths.
pub fn concat_list(parts: &[PathBuf]) -> CutlineResult<String> {
    let mut list = String::new();
    for part in parts {
        let absolute = if part.is_absolute() {
            part.clone()
        } else {
            std::env::current_dir()?.join(part)
        };
        let escaped = absolute.to_string_lossy().replace('\'', "'\\''");
        // Writing to a String cannot fail.
        let _ = writeln!(list, "file '{escaped}'");
    }
    Ok(list)
}

fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
