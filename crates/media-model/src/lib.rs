//! Cutline Media Model
//!
//! Defines the core data contracts shared by every Cutline component:
//! - **Timing:** exact rational frame rates, time ranges, inclusive frame ranges
//! - **Regions:** percentage bounding boxes and their pixel-space counterparts
//! - **Streams:** inspected media stream information
//! - **Findings:** externally supplied regions of interest and their tracked paths
//!
//! Seconds are converted to frame indices exactly once, through
//! [`FrameRate::frame_at`]. Everything downstream works in frames.

pub mod finding;
pub mod region;
pub mod stream;
pub mod timing;

pub use finding::*;
pub use region::*;
pub use stream::*;
pub use timing::*;

/// Errors raised while building model values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBox(String),
}
