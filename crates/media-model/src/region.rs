//! Region types for tracking and cropping.
//!
//! A [`BoundingBox`] is expressed in percent (`0..=100`) of the frame so it
//! survives resizing between tracking space and native space. Pixel
//! coordinates exist only at the edges, as [`PixelRect`].

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the longer edge.
    pub fn long_edge(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Length of the shorter edge.
    pub fn short_edge(&self) -> u32 {
        self.width.min(self.height)
    }

    /// Scale factor that brings the long edge down to `max_dim`, or `1.0`
    /// when the frame already fits.
    pub fn downscale_factor(&self, max_dim: u32) -> f64 {
        let long = self.long_edge();
        if max_dim == 0 || long <= max_dim {
            1.0
        } else {
            max_dim as f64 / long as f64
        }
    }

    /// Dimensions after applying `factor`, never below 1x1.
    pub fn scaled(&self, factor: f64) -> Resolution {
        Resolution {
            width: ((self.width as f64 * factor).round() as u32).max(1),
            height: ((self.height as f64 * factor).round() as u32).max(1),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for Resolution {
    type Err = ModelError;

    /// Parse `"1280x720"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidBox(format!("invalid resolution '{s}'"));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// A rectangle in percent of frame dimensions.
///
/// `(0, 0)` is the top-left corner; `left + width` and `top + height`
/// never exceed 100 for a box built with [`BoundingBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top edge (percent of height).
    pub top: f64,
    /// Left edge (percent of width).
    pub left: f64,
    /// Width (percent of width).
    pub width: f64,
    /// Height (percent of height).
    pub height: f64,
}

impl BoundingBox {
    /// The whole frame.
    pub const FULL: BoundingBox = BoundingBox {
        top: 0.0,
        left: 0.0,
        width: 100.0,
        height: 100.0,
    };

    /// Create a validated box. Edges are clamped to the frame; a box with no
    /// area left after clamping is rejected.
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Result<Self, ModelError> {
        if ![top, left, width, height].iter().all(|v| v.is_finite()) {
            return Err(ModelError::InvalidBox(format!(
                "non-finite box {top},{left},{width},{height}"
            )));
        }
        let top = top.clamp(0.0, 100.0);
        let left = left.clamp(0.0, 100.0);
        let width = width.clamp(0.0, 100.0 - left);
        let height = height.clamp(0.0, 100.0 - top);
        if width <= 0.0 || height <= 0.0 {
            return Err(ModelError::InvalidBox(format!(
                "box at top={top} left={left} has no area"
            )));
        }
        Ok(Self {
            top,
            left,
            width,
            height,
        })
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Convert to pixels for a frame of `res`.
    ///
    /// Offsets round down; extents round to nearest and are clamped so the
    /// rectangle stays inside the frame and is at least 1x1.
    pub fn to_pixels(&self, res: Resolution) -> PixelRect {
        let x = ((self.left / 100.0) * res.width as f64).floor() as u32;
        let y = ((self.top / 100.0) * res.height as f64).floor() as u32;
        let x = x.min(res.width.saturating_sub(1));
        let y = y.min(res.height.saturating_sub(1));
        let w = ((self.width / 100.0) * res.width as f64).round() as u32;
        let h = ((self.height / 100.0) * res.height as f64).round() as u32;
        PixelRect {
            x,
            y,
            width: w.clamp(1, (res.width - x).max(1)),
            height: h.clamp(1, (res.height - y).max(1)),
        }
    }

    /// Convert a pixel rectangle in a frame of `res` back to percent.
    pub fn from_pixels(rect: PixelRect, res: Resolution) -> Self {
        let fw = res.width.max(1) as f64;
        let fh = res.height.max(1) as f64;
        Self {
            top: rect.y as f64 / fh * 100.0,
            left: rect.x as f64 / fw * 100.0,
            width: rect.width as f64 / fw * 100.0,
            height: rect.height as f64 / fh * 100.0,
        }
    }

    /// Linearly interpolate between two boxes.
    pub fn lerp(a: &BoundingBox, b: &BoundingBox, t: f64) -> BoundingBox {
        let t = t.clamp(0.0, 1.0);
        BoundingBox {
            top: a.top + (b.top - a.top) * t,
            left: a.left + (b.left - a.left) * t,
            width: a.width + (b.width - a.width) * t,
            height: a.height + (b.height - a.height) * t,
        }
    }
}

/// A rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled(&self, factor: f64) -> PixelRect {
        PixelRect {
            x: (self.x as f64 * factor).round() as u32,
            y: (self.y as f64 * factor).round() as u32,
            width: ((self.width as f64 * factor).round() as u32).max(1),
            height: ((self.height as f64 * factor).round() as u32).max(1),
        }
    }

    /// Clamp to the frame, keeping at least one pixel.
    pub fn clamped_to(&self, res: Resolution) -> PixelRect {
        let x = self.x.min(res.width.saturating_sub(1));
        let y = self.y.min(res.height.saturating_sub(1));
        PixelRect {
            x,
            y,
            width: self.width.clamp(1, (res.width - x).max(1)),
            height: self.height.clamp(1, (res.height - y).max(1)),
        }
    }

    /// Backend crop filter argument (`crop=w:h:x:y`).
    pub fn to_crop_filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_crop_of_1000x800() {
        let bbox = BoundingBox::new(0.0, 0.0, 50.0, 50.0).unwrap();
        let rect = bbox.to_pixels(Resolution::new(1000, 800));
        assert_eq!(rect, PixelRect::new(0, 0, 500, 400));
    }

    #[test]
    fn test_to_pixels_clamps_to_frame() {
        let bbox = BoundingBox {
            top: 90.0,
            left: 90.0,
            width: 30.0,
            height: 30.0,
        };
        let rect = bbox.to_pixels(Resolution::new(1000, 800));
        assert_eq!(rect.x, 900);
        assert_eq!(rect.y, 720);
        assert_eq!(rect.right(), 1000);
        assert_eq!(rect.bottom(), 800);
    }

    #[test]
    fn test_tiny_box_is_at_least_one_pixel() {
        let bbox = BoundingBox::new(10.0, 10.0, 0.01, 0.01).unwrap();
        let rect = bbox.to_pixels(Resolution::new(100, 100));
        assert_eq!((rect.width, rect.height), (1, 1));
    }

    #[test]
    fn test_percent_survives_resolution_change() {
        let seed = BoundingBox::new(40.0, 40.0, 20.0, 20.0).unwrap();
        let native = Resolution::new(1920, 1080);
        let track = native.scaled(native.downscale_factor(640));
        assert_eq!(track, Resolution::new(640, 360));

        let rect = seed.to_pixels(track);
        let back = BoundingBox::from_pixels(rect, track);
        assert!((back.left - 40.0).abs() < 0.5);
        assert!((back.width - 20.0).abs() < 0.5);
    }

    #[test]
    fn test_new_rejects_empty_box() {
        assert!(BoundingBox::new(10.0, 100.0, 20.0, 20.0).is_err());
        assert!(BoundingBox::new(10.0, 10.0, 0.0, 20.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 10.0, 10.0, 20.0).is_err());
    }

    #[test]
    fn test_new_clamps_overflowing_extent() {
        let bbox = BoundingBox::new(80.0, 70.0, 50.0, 50.0).unwrap();
        assert_eq!(bbox.right(), 100.0);
        assert_eq!(bbox.bottom(), 100.0);
    }

    #[test]
    fn test_downscale_factor() {
        assert_eq!(Resolution::new(640, 480).downscale_factor(640), 1.0);
        assert_eq!(Resolution::new(1280, 720).downscale_factor(640), 0.5);
        assert_eq!(Resolution::new(720, 1280).downscale_factor(640), 0.5);
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = BoundingBox::new(20.0, 40.0, 30.0, 10.0).unwrap();
        let mid = BoundingBox::lerp(&a, &b, 0.5);
        assert_eq!(mid.top, 10.0);
        assert_eq!(mid.left, 20.0);
        assert_eq!(mid.width, 20.0);
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(
            "1280x720".parse::<Resolution>().unwrap(),
            Resolution::new(1280, 720)
        );
        assert!("1280".parse::<Resolution>().is_err());
        assert!("0x720".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_crop_filter_syntax() {
        assert_eq!(
            PixelRect::new(10, 20, 300, 200).to_crop_filter(),
            "crop=300:200:10:20"
        );
    }
}
