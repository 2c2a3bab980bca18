//! Cutline Region Tracker
//!
//! Propagates a seed bounding box across a frame range:
//! - **Sampling:** bounded number of tracked frames per finding
//! - **Frame sources:** numbered image sequences or in-memory frames
//! - **Appearance tracking:** template correlation with confidence gating
//! - **Masks:** white-box-on-black frames rasterized from a tracked path
//!
//! Tracking loss is a normal outcome and never an error. The returned
//! [`TrackedPath`](cutline_media_model::TrackedPath) records how far it got.

pub mod frames;
pub mod masks;
pub mod sampling;
pub mod template;
pub mod tracking;

pub use frames::{FrameSource, ImageSequence, InMemoryFrames};
pub use masks::rasterize_masks;
pub use sampling::{is_sampled, skip_rate};
pub use template::{TemplateTracker, VisualTracker};
pub use tracking::{track, track_findings, track_with};
