//! Audio stem separation contract.

use std::path::{Path, PathBuf};

use cutline_common::error::CutlineResult;
use serde::Serialize;

/// Filename fragments marking the accompaniment stem. Checked before the
/// vocal markers since `no_vocals` contains `vocal`.
const INSTRUMENTAL_MARKERS: &[&str] = &[
    "instrumental",
    "no_vocal",
    "novocal",
    "accompaniment",
    "music",
];
const VOCAL_MARKERS: &[&str] = &["vocal", "voice", "speech"];

/// Result of classifying a separator's output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeparationOutcome {
    Separated {
        vocals: PathBuf,
        instrumental: PathBuf,
    },
    /// Stems could not be identified; callers keep the original mix.
    Degraded {
        available: Vec<PathBuf>,
        reason: String,
    },
}

impl SeparationOutcome {
    pub fn is_separated(&self) -> bool {
        matches!(self, Self::Separated { .. })
    }
}

/// External stem separator.
pub trait AudioSeparator: Send + Sync {
    /// Split `audio` into stem files under `out_dir`.
    fn separate(&self, audio: &Path, out_dir: &Path) -> CutlineResult<Vec<PathBuf>>;

    fn name(&self) -> &str;
}

/// Run `separator` and classify what it produced.
pub fn separate_stems(
    separator: &dyn AudioSeparator,
    audio: &Path,
    out_dir: &Path,
) -> CutlineResult<SeparationOutcome> {
    let stems = separator.separate(audio, out_dir)?;
    let outcome = classify_stems(&stems);
    if let SeparationOutcome::Degraded { reason, .. } = &outcome {
        tracing::warn!(separator = separator.name(), %reason, "Stem separation degraded");
    }
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stem {
    Vocals,
    Instrumental,
}

fn stem_kind(path: &Path) -> Option<Stem> {
    let name = path.file_stem()?.to_str()?.to_ascii_lowercase();
    if INSTRUMENTAL_MARKERS.iter().any(|m| name.contains(m)) {
        Some(Stem::Instrumental)
    } else if VOCAL_MARKERS.iter().any(|m| name.contains(m)) {
        Some(Stem::Vocals)
    } else {
        None
    }
}

/// Identify vocal and instrumental stems by file name only.
///
/// Output order is never used; anything short of exactly one stem of each
/// kind is `Degraded`.
pub fn classify_stems(paths: &[PathBuf]) -> SeparationOutcome {
    let pick = |kind: Stem| -> Vec<&PathBuf> {
        paths
            .iter()
            .filter(|p| stem_kind(p) == Some(kind))
            .collect()
    };
    let vocals = pick(Stem::Vocals);
    let instrumental = pick(Stem::Instrumental);

    match (vocals.as_slice(), instrumental.as_slice()) {
        ([vocals], [instrumental]) => SeparationOutcome::Separated {
            vocals: (*vocals).clone(),
            instrumental: (*instrumental).clone(),
        },
        (v, i) => SeparationOutcome::Degraded {
            available: paths.to_vec(),
            reason: format!(
                "expected one vocal and one instrumental stem, found {} and {}",
                v.len(),
                i.len()
            ),
        },
    }
}
