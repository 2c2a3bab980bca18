//! Animated GIF previews.

use std::path::{Path, PathBuf};

use cutline_common::error::{CutlineError, CutlineResult};
use cutline_media_model::{FrameRange, TimeRange};
use serde::Serialize;

use crate::backend::path_arg;
use crate::{ensure_exists, ensure_parent, MediaEngine};

/// Preview sampling and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GifOptions {
    pub fps: u32,
    /// Output width; height follows the aspect ratio.
    pub width: u32,
    /// Longest preview produced, in seconds.
    pub max_secs: f64,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            fps: 10,
            width: 320,
            max_secs: 3.0,
        }
    }
}

impl GifOptions {
    pub fn validate(&self) -> CutlineResult<()> {
        if self.fps == 0 || self.width == 0 {
            return Err(CutlineError::invalid_input(format!(
                "preview needs a positive fps and width (got {} fps, {} px)",
                self.fps, self.width
            )));
        }
        if !self.max_secs.is_finite() || self.max_secs <= 0.0 {
            return Err(CutlineError::invalid_input(format!(
                "preview length {}s must be positive",
                self.max_secs
            )));
        }
        Ok(())
    }
}

/// Outcome of a preview render.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub output: PathBuf,
    /// Source frames the preview starts from, inclusive.
    pub frame_range: FrameRange,
    pub duration_secs: f64,
}

/// Single-pass palette filter: sample, scale, build a palette from the
/// clip itself, then map onto it.
pub fn gif_filter(options: &GifOptions) -> String {
    format!(
        "fps={},scale={}:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
        options.fps, options.width
    )
}

impl MediaEngine {
    /// Render a looping GIF of `source`, from `range` when given and from
    /// the start otherwise, capped at `options.max_secs`.
    pub fn preview_gif(
        &self,
        source: &Path,
        range: Option<TimeRange>,
        options: &GifOptions,
        output: &Path,
    ) -> CutlineResult<PreviewReport> {
        options.validate()?;
        ensure_exists(source)?;
        ensure_parent(output)?;

        let info = self.inspect(source)?;
        let frame_range = match range {
            Some(range) => self.resolve_range(&info, range, 0.0)?,
            None => {
                let last = info.last_frame().ok_or_else(|| {
                    CutlineError::invalid_input(format!("{} has no frames", source.display()))
                })?;
                FrameRange::new(0, last)
            }
        };
        let rate = info.frame_rate;
        let start_secs = rate.seconds_at(frame_range.start_frame);
        let duration_secs = rate.duration_of(frame_range.len()).min(options.max_secs);

        let args = vec![
            "-ss".to_string(),
            format!("{start_secs:.6}"),
            "-i".to_string(),
            path_arg(source),
            "-t".to_string(),
            format!("{duration_secs:.6}"),
            "-vf".to_string(),
            gif_filter(options),
            "-loop".to_string(),
            "0".to_string(),
            "-f".to_string(),
            "gif".to_string(),
            path_arg(output),
        ];

        tracing::info!(
            source = %source.display(),
            start_frame = frame_range.start_frame,
            duration_secs,
            fps = options.fps,
            width = options.width,
            "Rendering GIF preview"
        );
        self.backend().run_ffmpeg(&args)?;

        Ok(PreviewReport {
            output: output.to_path_buf(),
            frame_range,
            duration_secs,
        })
    }
}
