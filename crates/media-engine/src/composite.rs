//! Masked Compositing Engine.
//!
//! Mask convention: white selects the region to alter, black leaves the
//! source untouched. The merge primitive keeps its *second* input where
//! the mask is high, so the mask is inverted before merging and the
//! effected stream is passed first.
//!
//! The mask is always scaled to the source, never the reverse. All merge
//! inputs are converted to planar RGB so every plane of the mask carries
//! the same weight.

use std::path::PathBuf;

use cutline_common::error::{CutlineError, CutlineResult};
use cutline_media_model::Resolution;
use serde::Serialize;

use crate::backend::{path_arg, EncodePreset};
use crate::{ensure_exists, ensure_parent, MediaEngine};

/// Pixel format used for every merge input.
const MERGE_FORMAT: &str = "gbrp";

/// Effect applied inside the masked region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum MaskEffect {
    /// Box blur with the given radius.
    Blur { strength: u32 },
    /// Downscale by `block_size`, then nearest-neighbor upscale.
    Pixelate { block_size: u32 },
}

impl MaskEffect {
    /// Build an effect from its name (`blur`, `pixelate`) and intensity.
    pub fn from_name(name: &str, intensity: u32) -> CutlineResult<Self> {
        let effect = match name.trim().to_ascii_lowercase().as_str() {
            "blur" => Self::Blur {
                strength: intensity,
            },
            "pixelate" | "pixelize" => Self::Pixelate {
                block_size: intensity,
            },
            other => {
                return Err(CutlineError::invalid_input(format!(
                    "unknown effect '{other}' (expected blur or pixelate)"
                )))
            }
        };
        effect.validate()?;
        Ok(effect)
    }

    pub fn intensity(&self) -> u32 {
        match self {
            Self::Blur { strength } => *strength,
            Self::Pixelate { block_size } => *block_size,
        }
    }

    pub fn validate(&self) -> CutlineResult<()> {
        if self.intensity() == 0 {
            return Err(CutlineError::invalid_input(
                "effect intensity must be at least 1",
            ));
        }
        Ok(())
    }

    /// Clamp intensity to what the source geometry allows.
    pub fn clamped_for(&self, source: Resolution) -> Self {
        match *self {
            Self::Blur { strength } => Self::Blur {
                strength: strength.clamp(1, (source.short_edge() / 2).max(1)),
            },
            Self::Pixelate { block_size } => Self::Pixelate {
                block_size: block_size.clamp(1, source.short_edge().max(1)),
            },
        }
    }
}

/// Inputs to a masked composite.
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    pub source: PathBuf,
    /// Mask stream or still image; any resolution.
    pub mask: PathBuf,
    pub effect: MaskEffect,
    /// Replaces the source audio when set.
    pub audio: Option<PathBuf>,
    pub output: PathBuf,
}

/// The single polarity transform applied to every mask.
///
/// Turns "white = alter" into the merge primitive's "high = keep base"
/// convention.
pub fn mask_polarity_filter() -> String {
    format!("format=gray,negate,format={MERGE_FORMAT}")
}

/// Filter graph producing `[out]` from source `[0:v]` and mask `[1:v]`.
pub fn filter_graph(effect: MaskEffect, output_format: &str) -> String {
    let polarity = mask_polarity_filter();
    match effect {
        MaskEffect::Blur { strength } => format!(
            "[0:v]format={MERGE_FORMAT},split[base_src][toblur];\
             [toblur]boxblur={strength}:1[effected];\
             [1:v][base_src]scale2ref[mask_scaled][base];\
             [mask_scaled]{polarity}[mask_inverted];\
             [effected][base][mask_inverted]maskedmerge,format={output_format}[out]"
        ),
        MaskEffect::Pixelate { block_size } => format!(
            "[0:v]format={MERGE_FORMAT},split[base_src][toscale];\
             [toscale]scale=iw/{block_size}:ih/{block_size}:flags=neighbor[small];\
             [small][base_src]scale2ref=flags=neighbor[pixelated][base_ready];\
             [pixelated]format={MERGE_FORMAT}[effected];\
             [1:v][base_ready]scale2ref[mask_scaled][base];\
             [mask_scaled]{polarity}[mask_inverted];\
             [effected][base][mask_inverted]maskedmerge,format={output_format}[out]"
        ),
    }
}

impl MediaEngine {
    /// Apply `request.effect` only where the mask is white.
    pub fn apply_masked_effect(&self, request: &CompositeRequest) -> CutlineResult<PathBuf> {
        request.effect.validate()?;
        ensure_exists(&request.source)?;
        ensure_exists(&request.mask)?;
        if let Some(audio) = &request.audio {
            ensure_exists(audio)?;
        }
        ensure_parent(&request.output)?;

        let info = self.inspect(&request.source)?;
        let effect = request.effect.clamped_for(info.resolution());
        if effect != request.effect {
            tracing::warn!(
                requested = request.effect.intensity(),
                applied = effect.intensity(),
                "Effect intensity clamped to source geometry"
            );
        }

        let graph = filter_graph(effect, &self.encode_settings().pixel_format);
        let mut args = vec![
            "-i".to_string(),
            path_arg(&request.source),
            "-i".to_string(),
            path_arg(&request.mask),
        ];
        if let Some(audio) = &request.audio {
            args.extend(["-i".to_string(), path_arg(audio)]);
        }
        args.extend([
            "-filter_complex".to_string(),
            graph,
            "-map".to_string(),
            "[out]".to_string(),
        ]);
        args.extend(self.encode_settings().video_args(EncodePreset::Standard));

        if request.audio.is_some() {
            args.extend(["-map".to_string(), "2:a:0".to_string()]);
            args.extend(self.encode_settings().audio_args(None));
            args.push("-shortest".to_string());
        } else if info.has_audio {
            args.extend([
                "-map".to_string(),
                "0:a:0".to_string(),
                "-c:a".to_string(),
                "copy".to_string(),
            ]);
        } else {
            args.push("-an".to_string());
        }
        args.push(path_arg(&request.output));

        tracing::info!(
            source = %request.source.display(),
            mask = %request.mask.display(),
            effect = ?effect,
            "Applying masked effect"
        );
        self.backend()
            .run_ffmpeg(&args)
            .map_err(|e| CutlineError::composite(e.to_string()))?;

        Ok(request.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine, probe_doc, RecordingBackend};
    use std::sync::Arc;

    #[test]
    fn test_polarity_inverts_after_gray_conversion() {
        // White (alter) must become 0 so the merge takes the effected input.
        assert_eq!(mask_polarity_filter(), "format=gray,negate,format=gbrp");
    }

    #[test]
    fn test_effected_stream_is_first_merge_input() {
        for effect in [
            MaskEffect::Blur { strength: 10 },
            MaskEffect::Pixelate { block_size: 16 },
        ] {
            let graph = filter_graph(effect, "yuv420p");
            assert!(graph.contains("[effected][base][mask_inverted]maskedmerge"));
            assert!(graph.contains(&format!("[mask_scaled]{}[mask_inverted]", mask_polarity_filter())));
            assert!(graph.contains("[1:v][base"));
            assert!(graph.ends_with("format=yuv420p[out]"));
        }
    }

    #[test]
    fn test_mask_is_scaled_to_source() {
        let graph = filter_graph(MaskEffect::Blur { strength: 5 }, "yuv420p");
        // scale2ref scales its first input to the second.
        assert!(graph.contains("[1:v][base_src]scale2ref[mask_scaled][base]"));
    }

    #[test]
    fn test_pixelate_realigns_to_source_dimensions() {
        let graph = filter_graph(MaskEffect::Pixelate { block_size: 8 }, "yuv420p");
        assert!(graph.contains("scale=iw/8:ih/8:flags=neighbor"));
        assert!(graph.contains("[small][base_src]scale2ref=flags=neighbor[pixelated][base_ready]"));
    }

    #[test]
    fn test_intensity_validation_and_clamping() {
        assert!(MaskEffect::from_name("blur", 0).is_err());
        assert!(MaskEffect::from_name("sharpen", 3).is_err());
        assert_eq!(
            MaskEffect::from_name("Pixelate", 12).unwrap(),
            MaskEffect::Pixelate { block_size: 12 }
        );

        let clamped = MaskEffect::Blur { strength: 500 }.clamped_for(Resolution::new(320, 240));
        assert_eq!(clamped, MaskEffect::Blur { strength: 120 });
    }

    fn run(source_audio: bool, audio: bool) -> Vec<String> {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(RecordingBackend::with_default_probe(probe_doc(
            640, 360, "30/1", Some(90), 3.0, source_audio,
        )));
        let engine = engine(backend.clone(), dir.path());
        let source = dir.path().join("source.mp4");
        let mask = dir.path().join("mask.mp4");
        let track = dir.path().join("voice.wav");
        for p in [&source, &mask, &track] {
            std::fs::write(p, b"x").unwrap();
        }
        let request = CompositeRequest {
            source,
            mask,
            effect: MaskEffect::Blur { strength: 20 },
            audio: audio.then_some(track),
            output: dir.path().join("out.mp4"),
        };
        engine.apply_masked_effect(&request).unwrap();
        backend.calls().remove(0)
    }

    #[test]
    fn test_source_audio_is_copied() {
        let args = run(true, false);
        assert!(args.windows(2).any(|w| w[0] == "0:a:0"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "copy"));
    }

    #[test]
    fn test_missing_source_audio_is_omitted() {
        let args = run(false, false);
        assert!(args.contains(&"-an".to_string()));
    }

    #[test]
    fn test_explicit_audio_replaces_source_audio() {
        let args = run(true, true);
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "2:a:0"));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(!args.iter().any(|a| a == "0:a:0"));
    }
}
