//! Appearance-model tracking.
//!
//! [`TemplateTracker`] keeps a grayscale template of the object and looks
//! for it in a window around its last position with
//! [`match_template`]. Large boxes are matched on a downscaled window
//! first, then refined at full resolution around the coarse hit. Matches
//! whose zero-mean correlation falls below the confidence threshold report
//! loss.

use cutline_common::config::TrackingConfig;
use cutline_media_model::PixelRect;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};

/// Shorter template side targeted by the coarse pass.
const COARSE_SIDE: u32 = 16;

/// Scores this close to the maximum count as ties.
const TIE_EPSILON: f32 = 1e-5;

/// Variance below which a patch counts as flat.
const FLAT_VARIANCE: f64 = 1e-3;

/// Single-object tracker working on grayscale frames in tracking space.
pub trait VisualTracker: Send {
    /// Start tracking `rect` in `frame`. Returns `false` if the region is
    /// unusable (outside the frame).
    fn init(&mut self, frame: &GrayImage, rect: PixelRect) -> bool;

    /// Locate the object in the next sampled frame. `None` means lost.
    fn update(&mut self, frame: &GrayImage) -> Option<PixelRect>;

    /// Tracker name for logs.
    fn name(&self) -> &str;
}

/// Normalized cross-correlation template tracker.
#[derive(Debug, Clone)]
pub struct TemplateTracker {
    min_confidence: f64,
    search_margin: f64,
    learning_rate: f32,
    state: Option<TemplateState>,
}

#[derive(Debug, Clone)]
struct TemplateState {
    rect: PixelRect,
    /// Running-average appearance, row-major.
    model: Vec<f32>,
    /// `model` quantized for matching.
    template: GrayImage,
}

impl TemplateState {
    fn new(frame: &GrayImage, rect: PixelRect) -> Self {
        let patch = crop(frame, rect.x, rect.y, rect.width, rect.height);
        Self {
            rect,
            model: patch.pixels().map(|p| p.0[0] as f32).collect(),
            template: patch,
        }
    }

    fn blend(&mut self, patch: &GrayImage, rate: f32) {
        for (m, p) in self.model.iter_mut().zip(patch.pixels()) {
            *m = (1.0 - rate) * *m + rate * p.0[0] as f32;
        }
        let width = self.template.width();
        let model = &self.model;
        self.template = GrayImage::from_fn(width, self.template.height(), |x, y| {
            let v = model[(y * width + x) as usize];
            Luma([v.round().clamp(0.0, 255.0) as u8])
        });
    }
}

impl TemplateTracker {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            search_margin: config.search_margin.max(0.0),
            learning_rate: config.template_learning_rate.clamp(0.0, 1.0) as f32,
            state: None,
        }
    }
}

impl Default for TemplateTracker {
    fn default() -> Self {
        Self::new(&TrackingConfig::default())
    }
}

impl VisualTracker for TemplateTracker {
    fn init(&mut self, frame: &GrayImage, rect: PixelRect) -> bool {
        let (fw, fh) = frame.dimensions();
        if rect.width == 0 || rect.height == 0 || rect.right() > fw || rect.bottom() > fh {
            self.state = None;
            return false;
        }
        self.state = Some(TemplateState::new(frame, rect));
        true
    }

    fn update(&mut self, frame: &GrayImage) -> Option<PixelRect> {
        let state = self.state.as_mut()?;
        let (fw, fh) = frame.dimensions();
        let rect = state.rect;
        if rect.width > fw || rect.height > fh {
            return None;
        }

        let max_x = fw - rect.width;
        let max_y = fh - rect.height;
        let margin_x = (rect.width as f64 * self.search_margin).round() as u32;
        let margin_y = (rect.height as f64 * self.search_margin).round() as u32;
        let window = SearchWindow {
            x0: rect.x.saturating_sub(margin_x),
            x1: (rect.x + margin_x).min(max_x),
            y0: rect.y.saturating_sub(margin_y),
            y1: (rect.y + margin_y).min(max_y),
        };

        let factor = (rect.width.min(rect.height) / COARSE_SIDE).max(1);
        let window = if factor > 1 {
            let coarse = locate_coarse(frame, &state.template, &window, rect, factor);
            SearchWindow {
                x0: coarse.0.saturating_sub(factor).max(window.x0),
                x1: (coarse.0 + factor).min(window.x1),
                y0: coarse.1.saturating_sub(factor).max(window.y0),
                y1: (coarse.1 + factor).min(window.y1),
            }
        } else {
            window
        };
        let (x, y) = locate(frame, &state.template, &window, (rect.x, rect.y));

        let patch = crop(frame, x, y, rect.width, rect.height);
        let score = correlation(&state.model, &patch);
        if score < self.min_confidence {
            tracing::debug!(score, "Template match below confidence");
            return None;
        }

        state.blend(&patch, self.learning_rate);
        state.rect = PixelRect::new(x, y, rect.width, rect.height);
        Some(state.rect)
    }

    fn name(&self) -> &str {
        "template-ncc"
    }
}

/// Candidate top-left positions, inclusive.
struct SearchWindow {
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
}

impl SearchWindow {
    fn region(&self, frame: &GrayImage, width: u32, height: u32) -> GrayImage {
        crop(
            frame,
            self.x0,
            self.y0,
            self.x1 - self.x0 + width,
            self.y1 - self.y0 + height,
        )
    }
}

fn crop(frame: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> GrayImage {
    imageops::crop_imm(frame, x, y, width, height).to_image()
}

/// Best full-resolution position inside `window`, in frame coordinates.
fn locate(
    frame: &GrayImage,
    template: &GrayImage,
    window: &SearchWindow,
    previous: (u32, u32),
) -> (u32, u32) {
    let region = window.region(frame, template.width(), template.height());
    let scores = match_template(
        &region,
        template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    let prefer = (
        previous.0.saturating_sub(window.x0),
        previous.1.saturating_sub(window.y0),
    );
    let (lx, ly) = best_location(&scores, prefer);
    (window.x0 + lx, window.y0 + ly)
}

/// Best position on a `factor`-downscaled copy of the window, mapped back
/// to frame coordinates.
fn locate_coarse(
    frame: &GrayImage,
    template: &GrayImage,
    window: &SearchWindow,
    rect: PixelRect,
    factor: u32,
) -> (u32, u32) {
    let region = window.region(frame, rect.width, rect.height);
    let shrink = |img: &GrayImage| {
        let w = (img.width() / factor).max(1);
        let h = (img.height() / factor).max(1);
        imageops::resize(img, w, h, FilterType::Triangle)
    };
    let small_region = shrink(&region);
    let small_template = shrink(template);
    let scores = match_template(
        &small_region,
        &small_template,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    let prefer = (
        rect.x.saturating_sub(window.x0) / factor,
        rect.y.saturating_sub(window.y0) / factor,
    );
    let (lx, ly) = best_location(&scores, prefer);
    (
        (window.x0 + lx * factor).min(window.x1),
        (window.y0 + ly * factor).min(window.y1),
    )
}

/// Highest-scoring position; ties go to the one nearest `prefer`.
fn best_location(scores: &ImageBuffer<Luma<f32>, Vec<f32>>, prefer: (u32, u32)) -> (u32, u32) {
    let peak = find_extremes(scores).max_value;
    scores
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] >= peak - TIE_EPSILON)
        .map(|(x, y, _)| (x, y))
        .min_by_key(|&(x, y)| distance((x, y), prefer))
        .unwrap_or((0, 0))
}

fn distance(a: (u32, u32), b: (u32, u32)) -> u64 {
    let dx = (a.0 as i64 - b.0 as i64).unsigned_abs();
    let dy = (a.1 as i64 - b.1 as i64).unsigned_abs();
    dx * dx + dy * dy
}

/// Zero-mean normalized correlation between the appearance model and a
/// patch, in `[-1, 1]`.
///
/// A flat model falls back to mean absolute difference so uniform objects
/// can still be followed; a flat patch against a textured model scores zero.
fn correlation(model: &[f32], patch: &GrayImage) -> f64 {
    let values: Vec<f64> = patch.pixels().map(|p| p.0[0] as f64).collect();
    let n = model.len().min(values.len());
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_m = model[..n].iter().map(|&v| v as f64).sum::<f64>() / nf;
    let mean_p = values[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_m = 0.0;
    let mut var_p = 0.0;
    for (&m, &p) in model[..n].iter().zip(&values[..n]) {
        let dm = m as f64 - mean_m;
        let dp = p - mean_p;
        cov += dm * dp;
        var_m += dm * dm;
        var_p += dp * dp;
    }

    if var_m / nf < FLAT_VARIANCE {
        let mad = model[..n]
            .iter()
            .zip(&values[..n])
            .map(|(&m, &p)| (m as f64 - p).abs())
            .sum::<f64>()
            / nf;
        return 1.0 - mad / 255.0;
    }
    if var_p / nf < FLAT_VARIANCE {
        return 0.0;
    }
    cov / (var_m.sqrt() * var_p.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smooth bright blob on a dim gradient background.
    fn blob_frame(width: u32, height: u32, cx: f64, cy: f64, radius: f64) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let bg = 20.0 + (x + y) as f64 * 0.2;
            let d2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
            let blob = 220.0 * (-d2 / (2.0 * (radius / 2.0).powi(2))).exp();
            Luma([(bg + blob).min(255.0) as u8])
        })
    }

    #[test]
    fn test_follows_moving_blob() {
        let mut tracker = TemplateTracker::default();
        let frame0 = blob_frame(160, 120, 56.0, 56.0, 12.0);
        assert!(tracker.init(&frame0, PixelRect::new(40, 40, 32, 32)));

        for step in 1..=8u32 {
            let cx = 56.0 + 3.0 * step as f64;
            let frame = blob_frame(160, 120, cx, 56.0, 12.0);
            let rect = tracker.update(&frame).expect("blob stays visible");
            let expected_x = 40 + 3 * step;
            assert!(
                (rect.x as i64 - expected_x as i64).abs() <= 1,
                "step {step}: got x={} expected {expected_x}",
                rect.x
            );
            assert!((rect.y as i64 - 40).abs() <= 1);
        }
    }

    #[test]
    fn test_loses_object_on_blank_frame() {
        let mut tracker = TemplateTracker::default();
        let frame0 = blob_frame(160, 120, 56.0, 56.0, 12.0);
        assert!(tracker.init(&frame0, PixelRect::new(40, 40, 32, 32)));

        let blank = GrayImage::from_pixel(160, 120, Luma([0]));
        assert!(tracker.update(&blank).is_none());
    }

    #[test]
    fn test_init_rejects_out_of_frame_rect() {
        let mut tracker = TemplateTracker::default();
        let frame = GrayImage::from_pixel(50, 50, Luma([128]));
        assert!(!tracker.init(&frame, PixelRect::new(40, 40, 20, 20)));
        assert!(tracker.update(&frame).is_none());
    }

    #[test]
    fn test_uniform_object_is_followed() {
        let mut tracker = TemplateTracker::default();
        let frame0 = GrayImage::from_pixel(60, 60, Luma([200]));
        assert!(tracker.init(&frame0, PixelRect::new(10, 10, 20, 20)));
        let rect = tracker.update(&frame0).unwrap();
        assert_eq!((rect.x, rect.y), (10, 10));
    }

    #[test]
    fn test_large_box_uses_coarse_pass() {
        let mut tracker = TemplateTracker::default();
        let frame0 = blob_frame(320, 240, 120.0, 110.0, 30.0);
        assert!(tracker.init(&frame0, PixelRect::new(80, 70, 80, 80)));

        let frame1 = blob_frame(320, 240, 131.0, 104.0, 30.0);
        let rect = tracker.update(&frame1).expect("blob stays visible");
        assert!((rect.x as i64 - 91).abs() <= 1, "x={}", rect.x);
        assert!((rect.y as i64 - 64).abs() <= 1, "y={}", rect.y);
        assert_eq!((rect.width, rect.height), (80, 80));
    }

    #[test]
    fn test_ties_prefer_previous_position() {
        let scores = ImageBuffer::from_pixel(9, 9, Luma([1.0f32]));
        assert_eq!(best_location(&scores, (4, 3)), (4, 3));
    }

    #[test]
    fn test_correlation_bounds() {
        let ramp = GrayImage::from_fn(4, 4, |x, y| Luma([(y * 4 + x) as u8]));
        let model: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let inverted = GrayImage::from_fn(4, 4, |x, y| Luma([15 - (y * 4 + x) as u8]));
        assert!((correlation(&model, &ramp) - 1.0).abs() < 1e-9);
        assert!((correlation(&model, &inverted) + 1.0).abs() < 1e-9);
        assert_eq!(correlation(&model, &GrayImage::from_pixel(4, 4, Luma([7]))), 0.0);
    }
}
