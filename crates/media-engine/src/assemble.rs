//! Frame-sequence assembly.

use std::path::{Path, PathBuf};

use cutline_common::error::{CutlineError, CutlineResult};
use cutline_media_model::FrameRate;

use crate::backend::{path_arg, EncodePreset};
use crate::extract::{list_frames, FRAME_PATTERN};
use crate::{ensure_exists, ensure_parent, MediaEngine};

impl MediaEngine {
    /// Encode `frames_dir/frame_NNNNNN.png` at `rate`, optionally muxing
    /// `audio` and trimming to the shorter stream.
    ///
    /// Numbering may start anywhere but must be contiguous.
    pub fn assemble_frames(
        &self,
        frames_dir: &Path,
        output: &Path,
        rate: FrameRate,
        audio: Option<&Path>,
    ) -> CutlineResult<PathBuf> {
        ensure_exists(frames_dir)?;
        if let Some(audio) = audio {
            ensure_exists(audio)?;
        }
        let frames = list_frames(frames_dir)?;
        let indices = frame_indices(&frames)?;
        let first = *indices
            .first()
            .ok_or_else(|| CutlineError::invalid_input(format!(
                "no frame_*.png files in {}",
                frames_dir.display()
            )))?;
        if let Some(gap) = indices.windows(2).find(|w| w[1] != w[0] + 1) {
            return Err(CutlineError::invalid_input(format!(
                "frame sequence has a gap between {} and {}",
                gap[0], gap[1]
            )));
        }
        ensure_parent(output)?;

        let mut args = vec![
            "-framerate".to_string(),
            rate.to_filter_arg(),
            "-start_number".to_string(),
            first.to_string(),
            "-i".to_string(),
            path_arg(&frames_dir.join(FRAME_PATTERN)),
        ];
        if let Some(audio) = audio {
            args.extend(["-i".to_string(), path_arg(audio)]);
        }
        args.extend(self.encode_settings().video_args(EncodePreset::Standard));
        if audio.is_some() {
            args.extend([
                "-map".to_string(),
                "0:v:0".to_string(),
                "-map".to_string(),
                "1:a:0".to_string(),
            ]);
            args.extend(self.encode_settings().audio_args(None));
            args.push("-shortest".to_string());
        }
        args.push(path_arg(output));

        tracing::info!(
            frames = indices.len(),
            first,
            rate = %rate,
            with_audio = audio.is_some(),
            "Assembling frame sequence"
        );
        self.backend().run_ffmpeg(&args)?;
        Ok(output.to_path_buf())
    }
}

fn frame_indices(frames: &[PathBuf]) -> CutlineResult<Vec<u64>> {
    let mut indices = frames
        .iter()
        .map(|path| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("frame_"))
                .and_then(|digits| digits.parse::<u64>().ok())
                .ok_or_else(|| {
                    CutlineError::invalid_input(format!(
                        "unnumbered frame file {}",
                        path.display()
                    ))
                })
        })
        .collect::<CutlineResult<Vec<_>>>()?;
    indices.sort_unstable();
    Ok(indices)
}
