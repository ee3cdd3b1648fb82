// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarizer — turns the upright grayscale sheet into a clean two-level mask
// in which marks are foreground (255).

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{Mask, grayscale_close, grayscale_erode, grayscale_open};
use omrscan_core::ProcessorConfig;
use tracing::{debug, instrument};

use crate::scan::clahe::equalize_adaptive;

/// Which side of the Otsu level becomes foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// `v > t` is foreground.
    Normal,
    /// `v <= t` is foreground.
    Inverted,
}

/// Binarisation stage of the pipeline.
///
/// ## Steps
///
/// 1. CLAHE to even out lighting across the sheet
/// 2. Light Gaussian blur
/// 3. Otsu threshold, keeping whichever polarity has more foreground
/// 4. Opening then closing with a small elliptical kernel, then a final
///    erosion (a no-op at the default 1x1 size)
pub struct Binarizer {
    clahe_clip_limit: f32,
    clahe_tiles: u32,
    blur_sigma: f32,
    morph_kernel_size: u8,
    erode_kernel_size: u8,
}

impl Binarizer {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            clahe_clip_limit: config.clahe_clip_limit,
            clahe_tiles: config.clahe_tiles,
            blur_sigma: config.binarize_blur_sigma,
            morph_kernel_size: config.morph_kernel_size,
            erode_kernel_size: config.erode_kernel_size,
        }
    }

    /// Produce the binary sheet. Every output pixel is 0 or 255.
    #[instrument(skip_all, fields(width = gray.width(), height = gray.height()))]
    pub fn binarize(&self, gray: &GrayImage) -> GrayImage {
        let equalized = equalize_adaptive(gray, self.clahe_tiles, self.clahe_clip_limit);
        let smoothed = if self.blur_sigma > 0.0 {
            gaussian_blur_f32(&equalized, self.blur_sigma)
        } else {
            equalized
        };

        let level = otsu_threshold(&smoothed);
        let normal = apply_threshold(&smoothed, level, Polarity::Normal);
        let inverted = apply_threshold(&smoothed, level, Polarity::Inverted);
        let normal_count = foreground_count(&normal);
        let inverted_count = foreground_count(&inverted);

        let (binary, polarity) = if normal_count > inverted_count {
            (normal, Polarity::Normal)
        } else {
            (inverted, Polarity::Inverted)
        };
        debug!(level, normal_count, inverted_count, ?polarity, "Otsu polarity chosen");

        if self.morph_kernel_size == 0 {
            return binary;
        }
        let kernel = elliptical_mask(self.morph_kernel_size);
        let cleaned = grayscale_close(&grayscale_open(&binary, &kernel), &kernel);
        if self.erode_kernel_size > 1 {
            grayscale_erode(&cleaned, &elliptical_mask(self.erode_kernel_size))
        } else {
            cleaned
        }
    }
}

/// Elliptical structuring element of side `size`, anchored at `size / 2`.
///
/// Row `i` covers `c - dx ..= c + dx` clipped to the kernel, where
/// `dx = round(c * sqrt(1 - (i - r)^2 / r^2))`. Size 2 gives the L-shaped
/// `{(1,0), (0,1), (1,1)}`; size 1 a single point.
pub fn elliptical_mask(size: u8) -> Mask {
    let size = size.max(1);
    let n = size as i32;
    let r = n / 2;
    let c = n / 2;
    let mut shape = GrayImage::new(size as u32, size as u32);
    for i in 0..n {
        let dy = i - r;
        if dy.abs() > r {
            continue;
        }
        let dx = if r == 0 {
            0
        } else {
            let rr = (r * r) as f64;
            (c as f64 * ((rr - (dy * dy) as f64) / rr).sqrt()).round() as i32
        };
        for j in (c - dx).max(0)..(c + dx + 1).min(n) {
            shape.put_pixel(j as u32, i as u32, Luma([255u8]));
        }
    }
    Mask::from_image(&shape, c as u8, r as u8)
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Finds the threshold value that maximises the between-class variance of
/// the dark and light pixel groups.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Two-level image from a fixed threshold.
pub fn apply_threshold(gray: &GrayImage, level: u8, polarity: Polarity) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        let on = match polarity {
            Polarity::Normal => v > level,
            Polarity::Inverted => v <= level,
        };
        Luma([if on { 255 } else { 0 }])
    })
}

/// Number of non-zero pixels.
pub fn foreground_count(binary: &GrayImage) -> usize {
    binary.pixels().filter(|p| p[0] != 0).count()
}
