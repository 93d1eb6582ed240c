use image::{GrayImage, Luma, RgbImage};

use crate::config::KeyframeConfig;
use crate::error::{Error, Result};

/// Number of intensity bins in a luminance histogram.
pub const HISTOGRAM_BINS: usize = 256;

/// The luminance plane of a frame, the only pixel data the difference metrics read.
#[derive(Debug, Clone)]
pub struct LumaFrame {
    /// Position in the original sequence (0-based).
    pub index: usize,
    luma: GrayImage,
    histogram: [u32; HISTOGRAM_BINS],
}

impl LumaFrame {
    pub fn new(index: usize, luma: GrayImage) -> Self {
        let histogram = luma_histogram(&luma);
        Self {
            index,
            luma,
            histogram,
        }
    }

    /// Convert an RGB frame using BT.601 weights.
    pub fn from_rgb(index: usize, rgb: &RgbImage) -> Self {
        let luma = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
            let p = rgb.get_pixel(x, y);
            Luma([bt601_luma(p[0], p[1], p[2])])
        });
        Self::new(index, luma)
    }

    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    pub fn histogram(&self) -> &[u32; HISTOGRAM_BINS] {
        &self.histogram
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.luma.dimensions()
    }
}

fn bt601_luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

fn luma_histogram(luma: &GrayImage) -> [u32; HISTOGRAM_BINS] {
    let mut hist = [0u32; HISTOGRAM_BINS];
    for &v in luma.as_raw() {
        hist[v as usize] += 1;
    }
    hist
}

/// Weighted dissimilarity between a frame and a reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiffScore {
    pub motion: f64,
    pub color: f64,
}

impl DiffScore {
    /// Weighted motion plus weighted color. The two terms are not normalized
    /// beyond their weights.
    pub fn combined(&self) -> f64 {
        self.motion + self.color
    }
}

/// Computes motion and color scores between two frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameDiffer {
    motion_weight: f64,
    color_weight: f64,
}

impl FrameDiffer {
    pub fn new(motion_weight: f64, color_weight: f64) -> Self {
        Self {
            motion_weight,
            color_weight,
        }
    }

    pub fn from_config(config: &KeyframeConfig) -> Self {
        Self::new(config.motion_weight, config.color_weight)
    }

    /// Score `frame` against `reference`.
    ///
    /// Motion is the summed absolute luminance difference. Color is the
    /// chi-squared distance between the luminance histograms, normalized by
    /// `frame`'s bins, so the metric is not symmetric in its arguments.
    pub fn diff(&self, frame: &LumaFrame, reference: &LumaFrame) -> Result<DiffScore> {
        let (fw, fh) = frame.dimensions();
        let (rw, rh) = reference.dimensions();
        if (fw, fh) != (rw, rh) {
            return Err(Error::IncompatibleFrames {
                left_width: fw,
                left_height: fh,
                right_width: rw,
                right_height: rh,
            });
        }

        let motion = abs_diff_sum(frame.luma(), reference.luma()) as f64 * self.motion_weight;
        let color = chi_squared(frame.histogram(), reference.histogram()) * self.color_weight;
        Ok(DiffScore { motion, color })
    }
}

fn abs_diff_sum(a: &GrayImage, b: &GrayImage) -> u64 {
    a.as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum()
}

/// `Σ (a - b)² / a` over the bins where `a` is non-empty.
fn chi_squared(a: &[u32; HISTOGRAM_BINS], b: &[u32; HISTOGRAM_BINS]) -> f64 {
    a.iter()
        .zip(b)
        .filter(|(x, _)| **x > 0)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d / x as f64
        })
        .sum()
}
