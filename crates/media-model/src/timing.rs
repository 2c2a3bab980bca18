//! Frame-boundary arithmetic.
//!
//! A [`FrameRate`] is kept as an exact rational and only collapsed to a
//! float inside the conversion functions. Repeatedly rounding fractional
//! rates such as 30000/1001 is the main source of cumulative drift.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Absorbs binary representation error for timestamps that sit exactly
/// on a frame boundary (e.g. `0.1 * 30` evaluating to `2.9999999999999996`).
const FRAME_EPSILON: f64 = 1e-9;

/// An exact rational frame rate, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Create a frame rate, reducing the fraction.
    pub fn new(num: u32, den: u32) -> Result<Self, ModelError> {
        if num == 0 || den == 0 {
            return Err(ModelError::InvalidFrameRate(format!("{num}/{den}")));
        }
        let g = gcd(num, den);
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Integer frame rate.
    pub fn integer(fps: u32) -> Result<Self, ModelError> {
        Self::new(fps, 1)
    }

    /// Best rational approximation of a float rate.
    ///
    /// NTSC-style rates (29.97, 59.94, 23.976) map to their exact `/1001`
    /// forms; everything else is expressed over 1000.
    pub fn from_f64(fps: f64) -> Result<Self, ModelError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ModelError::InvalidFrameRate(fps.to_string()));
        }
        let ntsc = (fps * 1001.0 / 1000.0).round();
        if ntsc >= 1.0 && (ntsc * 1000.0 / 1001.0 - fps).abs() < 0.005 && fps.fract() != 0.0 {
            return Self::new(ntsc as u32 * 1000, 1001);
        }
        Self::new((fps * 1000.0).round() as u32, 1000)
    }

    /// Frames per second as a float. Use only at the point of consumption.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Frame index containing `seconds`: `floor(seconds * rate)`.
    ///
    /// Negative inputs map to frame 0.
    pub fn frame_at(&self, seconds: f64) -> u64 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        let exact = seconds * self.num as f64 / self.den as f64;
        (exact + FRAME_EPSILON).floor() as u64
    }

    /// Presentation time of the first instant of `frame`.
    pub fn seconds_at(&self, frame: u64) -> f64 {
        frame as f64 * self.den as f64 / self.num as f64
    }

    /// Duration of `frames` frames, in seconds.
    pub fn duration_of(&self, frames: u64) -> f64 {
        self.seconds_at(frames)
    }

    /// Whether `other` is close enough that resampling is unnecessary.
    pub fn is_close_to(&self, other: &FrameRate, tolerance_fps: f64) -> bool {
        (self.as_f64() - other.as_f64()).abs() < tolerance_fps
    }

    /// Backend filter notation (`30000/1001`).
    pub fn to_filter_arg(&self) -> String {
        format!("{}/{}", self.num, self.den)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for FrameRate {
    type Err = ModelError;

    /// Parse `"30000/1001"`, `"30/1"`, `"25"` or `"29.97"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((num, den)) = s.split_once('/') {
            let num = num
                .trim()
                .parse::<u32>()
                .map_err(|_| ModelError::InvalidFrameRate(s.to_string()))?;
            let den = den
                .trim()
                .parse::<u32>()
                .map_err(|_| ModelError::InvalidFrameRate(s.to_string()))?;
            return Self::new(num, den);
        }
        if let Ok(fps) = s.parse::<u32>() {
            return Self::integer(fps);
        }
        let fps = s
            .parse::<f64>()
            .map_err(|_| ModelError::InvalidFrameRate(s.to_string()))?;
        Self::from_f64(fps)
    }
}

/// A time range in seconds, as supplied by a human or an upstream finding.
///
/// Serialized as `startTime`/`endTime`; `start_secs`/`end_secs` are accepted
/// on input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(rename = "startTime", alias = "start_secs")]
    pub start_secs: f64,
    #[serde(rename = "endTime", alias = "end_secs")]
    pub end_secs: f64,
}

impl TimeRange {
    /// Create a validated range. Rejects non-finite, negative and inverted ranges.
    pub fn new(start_secs: f64, end_secs: f64) -> Result<Self, ModelError> {
        if !start_secs.is_finite() || !end_secs.is_finite() {
            return Err(ModelError::InvalidRange(format!(
                "non-finite bounds {start_secs}..{end_secs}"
            )));
        }
        if start_secs < 0.0 {
            return Err(ModelError::InvalidRange(format!(
                "start {start_secs:.3}s is negative"
            )));
        }
        if end_secs < start_secs {
            return Err(ModelError::InvalidRange(format!(
                "end {end_secs:.3}s precedes start {start_secs:.3}s"
            )));
        }
        Ok(Self {
            start_secs,
            end_secs,
        })
    }

    /// Convert to frame indices. This is the single alignment point.
    pub fn to_frames(&self, rate: FrameRate) -> FrameRange {
        FrameRange {
            start_frame: rate.frame_at(self.start_secs),
            end_frame: rate.frame_at(self.end_secs),
        }
    }

    /// Convert to frames and validate against a stream of `total_frames`.
    ///
    /// The start must fall inside the stream; an end past the stream is
    /// clamped to the last frame.
    pub fn to_frames_within(
        &self,
        rate: FrameRate,
        total_frames: u64,
    ) -> Result<FrameRange, ModelError> {
        if total_frames == 0 {
            return Err(ModelError::InvalidRange("stream has no frames".to_string()));
        }
        let range = self.to_frames(rate);
        if range.start_frame >= total_frames {
            return Err(ModelError::InvalidRange(format!(
                "start frame {} is beyond the last frame {}",
                range.start_frame,
                total_frames - 1
            )));
        }
        Ok(range.clamped(total_frames))
    }
}

/// An inclusive range of frame indices `[start_frame, end_frame]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    pub start_frame: u64,
    pub end_frame: u64,
}

impl FrameRange {
    /// Create an inclusive range; `end_frame` is raised to `start_frame` if lower.
    pub fn new(start_frame: u64, end_frame: u64) -> Self {
        Self {
            start_frame,
            end_frame: end_frame.max(start_frame),
        }
    }

    /// Number of frames covered (always at least 1).
    pub fn len(&self) -> u64 {
        self.end_frame - self.start_frame + 1
    }

    /// Never empty; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Frames between start and end, exclusive of the start.
    pub fn span(&self) -> u64 {
        self.end_frame - self.start_frame
    }

    pub fn contains(&self, frame: u64) -> bool {
        frame >= self.start_frame && frame <= self.end_frame
    }

    /// Clamp both ends to `[0, total_frames - 1]`, keeping `end >= start`.
    pub fn clamped(&self, total_frames: u64) -> Self {
        let last = total_frames.saturating_sub(1);
        let start = self.start_frame.min(last);
        let end = self.end_frame.min(last).max(start);
        Self {
            start_frame: start,
            end_frame: end,
        }
    }

    /// Widen symmetrically by `buffer_frames`, clamped to the stream.
    pub fn widened(&self, buffer_frames: u64, total_frames: u64) -> Self {
        Self {
            start_frame: self.start_frame.saturating_sub(buffer_frames),
            end_frame: self.end_frame.saturating_add(buffer_frames),
        }
        .clamped(total_frames)
    }

    /// Frames before this range: `[0, start_frame)`. `None` when empty.
    pub fn before(&self) -> Option<(u64, u64)> {
        (self.start_frame > 0).then_some((0, self.start_frame))
    }

    /// Frames after this range: `[end_frame + 1, total_frames)`. `None` when empty.
    pub fn after(&self, total_frames: u64) -> Option<(u64, u64)> {
        (self.end_frame + 1 < total_frames).then_some((self.end_frame + 1, total_frames))
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
