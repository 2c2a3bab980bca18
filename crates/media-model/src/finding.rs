//! Findings and tracked paths.
//!
//! A finding is supplied from outside (a detection service or a human) and
//! carries a time range and a seed box. Tracking populates `path` and
//! nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::region::BoundingBox;
use crate::timing::{FrameRange, TimeRange};
use crate::ModelError;

/// An externally supplied region of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,

    #[serde(flatten)]
    pub time_range: TimeRange,

    /// Seed box at the range's start. `None` yields an empty path.
    #[serde(rename = "box", default)]
    pub seed_box: Option<BoundingBox>,

    /// Tracked path, populated by the region tracker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<TrackedPath>,

    /// When `path` was last computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_at: Option<DateTime<Utc>>,
}

impl Finding {
    pub fn new(id: impl Into<String>, time_range: TimeRange, seed_box: Option<BoundingBox>) -> Self {
        Self {
            id: id.into(),
            time_range,
            seed_box,
            path: None,
            tracked_at: None,
        }
    }

    /// Re-check the time range after deserialization.
    pub fn validate(&self) -> Result<(), ModelError> {
        TimeRange::new(self.time_range.start_secs, self.time_range.end_secs).map(|_| ())
    }

    /// Attach a freshly computed path, replacing any earlier one.
    pub fn attach_path(&mut self, path: TrackedPath) {
        self.path = Some(path);
        self.tracked_at = Some(Utc::now());
    }
}

/// One sampled position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub frame: u64,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// How a tracking pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackingOutcome {
    /// Every sampled frame up to the end of the range was tracked.
    Complete,
    /// The tracker lost the object at `frame`; the path stops before it.
    Lost { frame: u64 },
    /// The finding had no seed box, or the seed frame could not be loaded.
    NoSeed,
}

/// Sparse, strictly frame-ordered sequence of boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPath {
    pub frame_range: FrameRange,
    pub points: Vec<TrackPoint>,
    pub outcome: TrackingOutcome,
}

impl TrackedPath {
    /// An empty path for a finding that cannot be tracked.
    pub fn no_seed(frame_range: FrameRange) -> Self {
        Self {
            frame_range,
            points: Vec::new(),
            outcome: TrackingOutcome::NoSeed,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether tracking stopped before the end of the range.
    pub fn is_partial(&self) -> bool {
        matches!(self.outcome, TrackingOutcome::Lost { .. })
    }

    /// Last frame with a known position.
    pub fn last_frame(&self) -> Option<u64> {
        self.points.last().map(|p| p.frame)
    }

    /// Box at an arbitrary frame, interpolated between samples.
    ///
    /// Frames before the first sample or after the last clamp to those
    /// samples. Returns `None` for an empty path.
    pub fn box_at(&self, frame: u64) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        if frame <= first.frame {
            return Some(first.bbox);
        }
        if frame >= last.frame {
            return Some(last.bbox);
        }

        let idx = self
            .points
            .binary_search_by_key(&frame, |p| p.frame)
            .unwrap_or_else(|i| i.saturating_sub(1));

        let a = &self.points[idx];
        let Some(b) = self.points.get(idx + 1) else {
            return Some(a.bbox);
        };

        let gap = (b.frame - a.frame) as f64;
        if gap < 1.0 {
            return Some(a.bbox);
        }
        let t = (frame - a.frame) as f64 / gap;
        Some(BoundingBox::lerp(&a.bbox, &b.bbox, t))
    }

    /// Whether frames strictly increase and the first point sits at the
    /// range start.
    pub fn is_well_formed(&self) -> bool {
        let ordered = self.points.windows(2).all(|w| w[0].frame < w[1].frame);
        let anchored = self
            .points
            .first()
            .map(|p| p.frame == self.frame_range.start_frame)
            .unwrap_or(true);
        ordered && anchored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(top: f64, left: f64) -> BoundingBox {
        BoundingBox::new(top, left, 10.0, 10.0).unwrap()
    }

    fn path() -> TrackedPath {
        TrackedPath {
            frame_range: FrameRange::new(0, 20),
            points: vec![
                TrackPoint {
                    frame: 0,
                    bbox: bbox(0.0, 0.0),
                },
                TrackPoint {
                    frame: 10,
                    bbox: bbox(10.0, 20.0),
                },
                TrackPoint {
                    frame: 20,
                    bbox: bbox(10.0, 40.0),
                },
            ],
            outcome: TrackingOutcome::Complete,
        }
    }

    #[test]
    fn test_box_at_interpolates_between_samples() {
        let p = path();
        let mid = p.box_at(5).unwrap();
        assert!((mid.top - 5.0).abs() < 1e-9);
        assert!((mid.left - 10.0).abs() < 1e-9);

        let exact = p.box_at(10).unwrap();
        assert_eq!(exact, bbox(10.0, 20.0));
    }

    #[test]
    fn test_box_at_clamps_outside_samples() {
        let mut p = path();
        p.frame_range = FrameRange::new(0, 30);
        assert_eq!(p.box_at(30).unwrap(), bbox(10.0, 40.0));
        assert!(TrackedPath::no_seed(FrameRange::new(0, 5)).box_at(3).is_none());
    }

    #[test]
    fn test_well_formed_path() {
        let mut p = path();
        assert!(p.is_well_formed());
        p.points.swap(1, 2);
        assert!(!p.is_well_formed());
    }

    #[test]
    fn test_finding_reads_orchestrator_record() {
        let json = r#"{
            "id": "f-1",
            "startTime": 1.5,
            "endTime": 3.0,
            "box": {"top": 40.0, "left": 40.0, "width": 20.0, "height": 20.0}
        }"#;
        let finding: Finding = serde_json::from_str(json).unwrap();
        assert_eq!(finding.id, "f-1");
        assert_eq!(finding.time_range.start_secs, 1.5);
        assert_eq!(finding.seed_box.unwrap().width, 20.0);
        assert!(finding.path.is_none());
        assert!(finding.validate().is_ok());
    }

    #[test]
    fn test_finding_accepts_seconds_field_names() {
        let json = r#"{"id": "f-5", "start_secs": 2.0, "end_secs": 2.5}"#;
        let finding: Finding = serde_json::from_str(json).unwrap();
        assert_eq!(finding.time_range, TimeRange::new(2.0, 2.5).unwrap());

        let written = serde_json::to_value(&finding).unwrap();
        assert_eq!(written["startTime"], 2.0);
        assert_eq!(written["endTime"], 2.5);
        assert!(written.get("start_secs").is_none());
    }

    #[test]
    fn test_finding_without_box() {
        let json = r#"{"id": "f-2", "startTime": 0.0, "endTime": 1.0}"#;
        let finding: Finding = serde_json::from_str(json).unwrap();
        assert!(finding.seed_box.is_none());
    }

    #[test]
    fn test_inverted_finding_fails_validation() {
        let json = r#"{"id": "f-3", "startTime": 4.0, "endTime": 1.0}"#;
        let finding: Finding = serde_json::from_str(json).unwrap();
        assert!(finding.validate().is_err());
    }

    #[test]
    fn test_attach_path_stamps_time() {
        let mut finding = Finding::new("f-4", TimeRange::new(0.0, 1.0).unwrap(), None);
        finding.attach_path(TrackedPath::no_seed(FrameRange::new(0, 30)));
        assert!(finding.path.is_some());
        assert!(finding.tracked_at.is_some());

        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains(r#""status":"no_seed""#));
    }
}
