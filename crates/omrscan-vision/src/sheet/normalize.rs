// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective normalizer — maps the located sheet quadrilateral onto an
// upright rectangle and brings it up to the working resolution.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use omrscan_core::ProcessorConfig;
use omrscan_core::error::OmrError;
use tracing::{info, instrument, warn};

use crate::raster::SheetImage;
use crate::sheet::locate::Quadrilateral;

/// Sort four corner points into top-left, top-right, bottom-right, bottom-left.
///
/// Top-left has the smallest `x + y` and bottom-right the largest; top-right
/// has the smallest `y - x` and bottom-left the largest. Ties go to the first
/// point in input order.
pub fn order_corners(points: [(f32, f32); 4]) -> [(f32, f32); 4] {
    let sum = |p: &(f32, f32)| p.0 + p.1;
    let diff = |p: &(f32, f32)| p.1 - p.0;
    [
        extreme(&points, sum, false),
        extreme(&points, diff, false),
        extreme(&points, sum, true),
        extreme(&points, diff, true),
    ]
}

/// First point with the smallest (or largest) key.
fn extreme(
    points: &[(f32, f32); 4],
    key: impl Fn(&(f32, f32)) -> f32,
    largest: bool,
) -> (f32, f32) {
    let mut best = points[0];
    let mut best_key = key(&best);
    for p in &points[1..] {
        let k = key(p);
        if (largest && k > best_key) || (!largest && k < best_key) {
            best = *p;
            best_key = k;
        }
    }
    best
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Produces the upright, grayscale sheet the binarizer works on.
pub struct PerspectiveNormalizer {
    min_dimension: u32,
}

impl PerspectiveNormalizer {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            min_dimension: config.min_dimension,
        }
    }

    /// Warp, upscale and convert to grayscale.
    #[instrument(skip_all)]
    pub fn normalize(&self, photo: &RgbImage, quad: &Quadrilateral) -> Result<GrayImage, OmrError> {
        let warped = self.warp(photo, quad)?;
        let sheet = SheetImage::from_dynamic(DynamicImage::ImageRgb8(warped))
            .upscale_to_min(self.min_dimension);
        Ok(sheet.to_luma8())
    }

    /// Map the quadrilateral onto a `w x h` rectangle.
    ///
    /// `w` is the longer of the top and bottom edges and `h` the longer of the
    /// left and right edges. Pixels sampled from outside the photo are white.
    pub fn warp(&self, photo: &RgbImage, quad: &Quadrilateral) -> Result<RgbImage, OmrError> {
        let [tl, tr, br, bl] = order_corners(quad.corners);
        let ordered = Quadrilateral::new([tl, tr, br, bl]);
        if !ordered.is_simple() {
            warn!(corners = ?ordered.corners, "Sheet corners do not form a simple quadrilateral");
            return Err(OmrError::SheetNotFound);
        }

        let out_w = (distance(br, bl).max(distance(tr, tl)).round() as u32).max(1);
        let out_h = (distance(tr, br).max(distance(tl, bl)).round() as u32).max(1);
        let (max_x, max_y) = ((out_w - 1) as f32, (out_h - 1) as f32);
        let dest: [(f32, f32); 4] = [(0.0, 0.0), (max_x, 0.0), (max_x, max_y), (0.0, max_y)];

        let projection = Projection::from_control_points([tl, tr, br, bl], dest).ok_or_else(|| {
            warn!("Failed to compute projective transform");
            OmrError::SheetNotFound
        })?;

        let mut output = RgbImage::new(out_w, out_h);
        warp_into(photo, &projection, Interpolation::Bilinear, Rgb([255u8, 255, 255]), &mut output);

        info!(out_w, out_h, "Perspective correction applied");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn corners_are_ordered_clockwise_from_top_left() {
        let shuffled = [(90.0, 10.0), (10.0, 80.0), (12.0, 8.0), (95.0, 85.0)];
        assert_eq!(
            order_corners(shuffled),
            [(12.0, 8.0), (90.0, 10.0), (95.0, 85.0), (10.0, 80.0)]
        );
    }

    #[test]
    fn warp_size_uses_longest_opposite_edges() {
        let photo = RgbImage::from_pixel(300, 300, Rgb([200, 200, 200]));
        let quad = Quadrilateral::new([(20.0, 20.0), (220.0, 20.0), (230.0, 170.0), (20.0, 170.0)]);
        let normalizer = PerspectiveNormalizer::new(&ProcessorConfig::default());
        let warped = normalizer.warp(&photo, &quad).unwrap();
        // Bottom edge is 210 long, left edge 150, right edge ~150.3.
        assert_eq!(warped.dimensions(), (210, 150));
    }

    #[test]
    fn warp_of_axis_aligned_region_crops_it() {
        let mut photo = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        draw_filled_rect_mut(&mut photo, Rect::at(50, 50).of_size(100, 100), Rgb([0, 0, 0]));
        let quad = Quadrilateral::new([(149.0, 50.0), (50.0, 50.0), (50.0, 149.0), (149.0, 149.0)]);
        let normalizer = PerspectiveNormalizer::new(&ProcessorConfig::default());
        let warped = normalizer.warp(&photo, &quad).unwrap();
        assert_eq!(warped.dimensions(), (99, 99));
        assert_eq!(warped.get_pixel(49, 49), &Rgb([0, 0, 0]));
        assert_eq!(warped.get_pixel(2, 2), &Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_quad_is_rejected() {
        let photo = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        let quad = Quadrilateral::new([(10.0, 10.0), (10.0, 10.0), (10.0, 10.0), (10.0, 10.0)]);
        let normalizer = PerspectiveNormalizer::new(&ProcessorConfig::default());
        assert!(matches!(normalizer.warp(&photo, &quad), Err(OmrError::SheetNotFound)));
    }

    #[test]
    fn normalize_upscales_to_minimum() {
        let photo = RgbImage::from_pixel(400, 400, Rgb([128, 128, 128]));
        let quad = Quadrilateral::new([(0.0, 0.0), (300.0, 0.0), (300.0, 150.0), (0.0, 150.0)]);
        let config = ProcessorConfig {
            min_dimension: 600,
            ..ProcessorConfig::default()
        };
        let gray = PerspectiveNormalizer::new(&config).normalize(&photo, &quad).unwrap();
        assert!(gray.width() >= 600 && gray.height() >= 600);
    }
}
