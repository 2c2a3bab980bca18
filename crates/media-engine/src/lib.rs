//! Cutline Media Engine
//!
//! Frame-accurate media operations on top of an external backend:
//! - **Inspect:** stream properties with exact rational frame rates
//! - **Normalize:** resample frame rate and letterbox to a target geometry
//! - **Splice:** replace a frame range with an external clip
//! - **Composite:** blur or pixelate the region selected by a mask stream
//! - **Extract:** sub-clips, single frames, frame sequences, audio
//! - **Assemble:** encode a numbered frame sequence into a video
//! - **Preview:** looping GIF of a clip or range
//!
//! Every operation inspects its inputs afresh; nothing is cached between
//! calls.

pub mod assemble;
pub mod backend;
pub mod composite;
pub mod extract;
pub mod inspect;
pub mod normalize;
pub mod preview;
pub mod splice;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cutline_common::config::AppConfig;
use cutline_common::error::{CutlineError, CutlineResult};
use cutline_media_model::{FrameRange, MediaStreamInfo, TimeRange};

pub use backend::{AudioLayout, EncodePreset, EncodeSettings, FfmpegCli, MediaBackend};
pub use composite::{mask_polarity_filter, CompositeRequest, MaskEffect};
pub use extract::{ClipReport, ExtractedFrame};
pub use normalize::{AudioHandling, NormalizeOptions, NormalizeReport};
pub use preview::{gif_filter, GifOptions, PreviewReport};
pub use splice::{SegmentInfo, SegmentRole, SpliceReport, SpliceRequest};

/// Entry point for all media operations.
#[derive(Clone)]
pub struct MediaEngine {
    backend: Arc<dyn MediaBackend>,
    encode: EncodeSettings,
    scratch_root: PathBuf,
}

impl MediaEngine {
    /// Engine backed by the ffmpeg CLI named in `config`.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_backend(Arc::new(FfmpegCli::new(&config.backend)), config)
    }

    /// Engine with an explicit backend.
    pub fn with_backend(backend: Arc<dyn MediaBackend>, config: &AppConfig) -> Self {
        Self {
            backend,
            encode: EncodeSettings::from_config(&config.encode),
            scratch_root: config.scratch_root(),
        }
    }

    pub fn backend(&self) -> &dyn MediaBackend {
        self.backend.as_ref()
    }

    pub fn encode_settings(&self) -> &EncodeSettings {
        &self.encode
    }

    /// Create a scoped temporary directory, removed when dropped.
    pub(crate) fn scratch_dir(&self, prefix: &str) -> CutlineResult<tempfile::TempDir> {
        std::fs::create_dir_all(&self.scratch_root)?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(&self.scratch_root)
            .map_err(CutlineError::from)
    }

    /// Convert a time range to frames within `info`, widened by
    /// `buffer_secs` on both sides.
    ///
    /// This is the single point where seconds become frame indices for
    /// cutting operations.
    pub fn resolve_range(
        &self,
        info: &MediaStreamInfo,
        time_range: TimeRange,
        buffer_secs: f64,
    ) -> CutlineResult<FrameRange> {
        if !buffer_secs.is_finite() || buffer_secs < 0.0 {
            return Err(CutlineError::invalid_range(format!(
                "buffer {buffer_secs}s must be a non-negative number"
            )));
        }
        let range = time_range
            .to_frames_within(info.frame_rate, info.total_frames)
            .map_err(|e| CutlineError::invalid_range(e.to_string()))?;
        let buffer_frames = info.frame_rate.frame_at(buffer_secs);
        let widened = range.widened(buffer_frames, info.total_frames);

        tracing::debug!(
            start_frame = widened.start_frame,
            end_frame = widened.end_frame,
            buffer_frames,
            total_frames = info.total_frames,
            "Resolved frame range"
        );
        Ok(widened)
    }
}

pub(crate) fn ensure_parent(path: &Path) -> CutlineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub(crate) fn ensure_exists(path: &Path) -> CutlineResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(CutlineError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}
