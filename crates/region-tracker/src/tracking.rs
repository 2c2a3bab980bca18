//! The tracking loop.

use cutline_common::config::TrackingConfig;
use cutline_media_model::{
    BoundingBox, Finding, FrameRate, Resolution, TrackPoint, TrackedPath, TrackingOutcome,
};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

use crate::frames::FrameSource;
use crate::sampling::{is_sampled, skip_rate};
use crate::template::{TemplateTracker, VisualTracker};

/// Track a finding's seed box across its frame range with the default
/// appearance tracker.
pub fn track(
    finding: &Finding,
    frames: &dyn FrameSource,
    rate: FrameRate,
    config: &TrackingConfig,
) -> TrackedPath {
    let mut tracker = TemplateTracker::new(config);
    track_with(finding, frames, rate, config, &mut tracker)
}

/// Track a finding with a caller-supplied tracker.
///
/// The first point is always the seed box, unscaled, at the range's start
/// frame. Loss stops the pass and is reported in the path's outcome.
pub fn track_with(
    finding: &Finding,
    frames: &dyn FrameSource,
    rate: FrameRate,
    config: &TrackingConfig,
    tracker: &mut dyn VisualTracker,
) -> TrackedPath {
    let total = frames.frame_count();
    let range = if total == 0 {
        finding.time_range.to_frames(rate)
    } else {
        finding.time_range.to_frames(rate).clamped(total)
    };

    let Some(seed) = finding.seed_box else {
        tracing::info!(finding = %finding.id, "Finding has no seed box; skipping tracking");
        return TrackedPath::no_seed(range);
    };
    if total == 0 {
        tracing::warn!(finding = %finding.id, "No frames to track");
        return TrackedPath::no_seed(range);
    }

    let Some(first) = frames.load(range.start_frame) else {
        tracing::warn!(
            finding = %finding.id,
            frame = range.start_frame,
            "Seed frame could not be loaded"
        );
        return TrackedPath::no_seed(range);
    };

    let native = Resolution::new(first.width(), first.height());
    let factor = native.downscale_factor(config.max_track_dim);
    let working = native.scaled(factor);

    let mut points = vec![TrackPoint {
        frame: range.start_frame,
        bbox: seed,
    }];

    if !tracker.init(&to_working(&first, working), seed.to_pixels(working)) {
        tracing::warn!(finding = %finding.id, "Tracker rejected seed region");
        return TrackedPath {
            frame_range: range,
            points,
            outcome: TrackingOutcome::Lost {
                frame: range.start_frame,
            },
        };
    }

    let skip = skip_rate(range.span(), config.target_points);
    tracing::info!(
        finding = %finding.id,
        tracker = tracker.name(),
        start_frame = range.start_frame,
        end_frame = range.end_frame,
        skip,
        scale = factor,
        "Tracking finding"
    );

    let mut outcome = TrackingOutcome::Complete;
    for index in range.start_frame + 1..=range.end_frame {
        if !is_sampled(index, range.start_frame, range.end_frame, skip) {
            continue;
        }
        let Some(frame) = frames.load(index) else {
            tracing::debug!(finding = %finding.id, frame = index, "Skipping unreadable frame");
            continue;
        };

        match tracker.update(&to_working(&frame, working)) {
            Some(rect) => {
                let bbox = BoundingBox::from_pixels(
                    rect.scaled(1.0 / factor).clamped_to(native),
                    native,
                );
                points.push(TrackPoint { frame: index, bbox });
            }
            None => {
                tracing::warn!(
                    finding = %finding.id,
                    frame = index,
                    points = points.len(),
                    "Tracking lost; returning partial path"
                );
                outcome = TrackingOutcome::Lost { frame: index };
                break;
            }
        }
    }

    TrackedPath {
        frame_range: range,
        points,
        outcome,
    }
}

/// Track every finding and attach the resulting paths.
///
/// Each finding gets its own tracker and runs on its own thread; frames are
/// shared read-only.
pub fn track_findings(
    findings: &mut [Finding],
    frames: &dyn FrameSource,
    rate: FrameRate,
    config: &TrackingConfig,
) {
    let paths: Vec<TrackedPath> = std::thread::scope(|scope| {
        let handles: Vec<_> = findings
            .iter()
            .map(|finding| scope.spawn(move || track(finding, frames, rate, config)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    for (finding, path) in findings.iter_mut().zip(paths) {
        finding.attach_path(path);
    }
}

fn to_working(frame: &DynamicImage, working: Resolution) -> GrayImage {
    let gray = frame.to_luma8();
    if gray.dimensions() == (working.width, working.height) {
        gray
    } else {
        image::imageops::resize(&gray, working.width, working.height, FilterType::Triangle)
    }
}
