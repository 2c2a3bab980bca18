//! Mask frames from a tracked path.
//!
//! White marks the region to alter, black leaves the source untouched.
//! Files are written as `frame_%06d.png`, numbered from zero at the first
//! frame of the requested range, so they assemble straight into a mask
//! stream aligned with that range.

use std::path::{Path, PathBuf};

use cutline_common::error::{CutlineError, CutlineResult};
use cutline_media_model::{FrameRange, Resolution, TrackedPath};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

const SELECTED: Luma<u8> = Luma([255]);
const UNSELECTED: Luma<u8> = Luma([0]);

/// Write one mask frame per index in `output_range`.
///
/// Frames outside the path's own range are black; frames inside it use
/// the interpolated box.
pub fn rasterize_masks(
    path: &TrackedPath,
    output_range: FrameRange,
    resolution: Resolution,
    out_dir: &Path,
) -> CutlineResult<Vec<PathBuf>> {
    if resolution.width == 0 || resolution.height == 0 {
        return Err(CutlineError::invalid_input(format!(
            "mask resolution {resolution} has no area"
        )));
    }
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(output_range.len() as usize);
    for frame in output_range.start_frame..=output_range.end_frame {
        let mask = mask_for_frame(path, frame, resolution);
        let file = out_dir.join(format!(
            "frame_{:06}.png",
            frame - output_range.start_frame
        ));
        mask.save(&file)
            .map_err(|e| CutlineError::image(format!("{}: {e}", file.display())))?;
        written.push(file);
    }

    tracing::info!(
        frames = written.len(),
        points = path.len(),
        dir = %out_dir.display(),
        "Rasterized mask frames"
    );
    Ok(written)
}

/// Render the mask for a single frame.
pub fn mask_for_frame(path: &TrackedPath, frame: u64, resolution: Resolution) -> GrayImage {
    let mut mask = GrayImage::from_pixel(resolution.width, resolution.height, UNSELECTED);
    if !path.frame_range.contains(frame) {
        return mask;
    }
    if let Some(bbox) = path.box_at(frame) {
        let rect = bbox.to_pixels(resolution);
        draw_filled_rect_mut(
            &mut mask,
            Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height),
            SELECTED,
        );
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_media_model::{BoundingBox, TrackPoint, TrackingOutcome};

    fn path() -> TrackedPath {
        TrackedPath {
            frame_range: FrameRange::new(2, 4),
            points: vec![
                TrackPoint {
                    frame: 2,
                    bbox: BoundingBox::new(0.0, 0.0, 50.0, 50.0).unwrap(),
                },
                TrackPoint {
                    frame: 4,
                    bbox: BoundingBox::new(50.0, 50.0, 50.0, 50.0).unwrap(),
                },
            ],
            outcome: TrackingOutcome::Complete,
        }
    }

    #[test]
    fn test_mask_selects_box_in_white() {
        let mask = mask_for_frame(&path(), 2, Resolution::new(100, 80));
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
        assert_eq!(mask.get_pixel(49, 39).0[0], 255);
        assert_eq!(mask.get_pixel(50, 40).0[0], 0);
        assert_eq!(mask.get_pixel(99, 79).0[0], 0);
    }

    #[test]
    fn test_frames_outside_path_range_are_black() {
        let mask = mask_for_frame(&path(), 5, Resolution::new(100, 80));
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_rasterize_numbers_from_range_start() {
        let dir = tempfile::tempdir().unwrap();
        let files = rasterize_masks(
            &path(),
            FrameRange::new(0, 5),
            Resolution::new(40, 20),
            dir.path(),
        )
        .unwrap();

        assert_eq!(files.len(), 6);
        assert!(files[0].ends_with("frame_000000.png"));
        assert!(files[5].ends_with("frame_000005.png"));

        let middle = image::open(&files[3]).unwrap().to_luma8();
        // Frame 3 interpolates halfway: box at 25%..75%.
        assert_eq!(middle.get_pixel(20, 10).0[0], 255);
        assert_eq!(middle.get_pixel(2, 2).0[0], 0);
    }
}
