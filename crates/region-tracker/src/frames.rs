//! Frame sources for tracking.

use std::path::{Path, PathBuf};

use cutline_common::error::{CutlineError, CutlineResult};
use image::DynamicImage;

/// Random access to decoded frames by index.
///
/// `load` returns `None` for a frame that cannot be decoded; the tracking
/// loop skips such frames instead of failing.
pub trait FrameSource: Send + Sync {
    /// Number of frames available.
    fn frame_count(&self) -> u64;

    /// Decode the frame at `index`.
    fn load(&self, index: u64) -> Option<DynamicImage>;
}

/// A directory of numbered frame images (`frame_000000.png`, ...).
///
/// Files are ordered lexicographically, which equals temporal order for
/// fixed-width zero-padded names.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
}

impl ImageSequence {
    /// Scan `dir` for `frame_*` images.
    pub fn open(dir: &Path) -> CutlineResult<Self> {
        if !dir.is_dir() {
            return Err(CutlineError::FileNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if is_frame_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(CutlineError::invalid_input(format!(
                "no frame_* images in {}",
                dir.display()
            )));
        }

        tracing::debug!(dir = %dir.display(), frames = paths.len(), "Opened image sequence");
        Ok(Self { paths })
    }

    pub fn path(&self, index: u64) -> Option<&Path> {
        self.paths.get(index as usize).map(PathBuf::as_path)
    }
}

impl FrameSource for ImageSequence {
    fn frame_count(&self) -> u64 {
        self.paths.len() as u64
    }

    fn load(&self, index: u64) -> Option<DynamicImage> {
        let path = self.path(index)?;
        match image::open(path) {
            Ok(img) => Some(img),
            Err(e) => {
                tracing::warn!(frame = index, path = %path.display(), "Failed to decode frame: {e}");
                None
            }
        }
    }
}

fn is_frame_file(path: &Path) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("frame_"))
        .unwrap_or(false);
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false);
    name_ok && ext_ok
}

/// Frames held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrames {
    frames: Vec<DynamicImage>,
}

impl InMemoryFrames {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self { frames }
    }
}

impl FrameSource for InMemoryFrames {
    fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    fn load(&self, index: u64) -> Option<DynamicImage> {
        self.frames.get(index as usize).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_sequence_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for (i, shade) in [(2u32, 20u8), (0, 0), (1, 10)] {
            GrayImage::from_pixel(4, 4, Luma([shade]))
                .save(dir.path().join(format!("frame_{i:06}.png")))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        std::fs::write(dir.path().join("mask_000000.png"), "ignore me").unwrap();

        let seq = ImageSequence::open(dir.path()).unwrap();
        assert_eq!(seq.frame_count(), 3);
        assert!(seq.path(0).unwrap().ends_with("frame_000000.png"));
        assert_eq!(seq.load(1).unwrap().to_luma8().get_pixel(0, 0).0[0], 10);
        assert!(seq.load(3).is_none());
    }

    #[test]
    fn test_corrupt_frame_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("frame_000000.png"), b"not a png").unwrap();
        let seq = ImageSequence::open(dir.path()).unwrap();
        assert!(seq.load(0).is_none());
    }

    #[test]
    fn test_empty_dir_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageSequence::open(dir.path()).unwrap_err();
        assert!(matches!(err, CutlineError::InvalidInput { .. }));
    }

    #[test]
    fn test_missing_dir_is_not_found() {
        let err = ImageSequence::open(Path::new("/nonexistent/cutline/frames")).unwrap_err();
        assert!(matches!(err, CutlineError::FileNotFound { .. }));
    }
}
