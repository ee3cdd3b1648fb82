// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet locator — edge detection and contour search for the quadrilateral
// outline of the answer sheet.

use image::RgbImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use omrscan_core::ProcessorConfig;
use omrscan_core::error::OmrError;
use tracing::{debug, info, instrument, warn};

use crate::contour::{approximate_closed_polygon, external_contours, perimeter, shoelace_area};

/// Four corner points approximating the sheet outline, in contour order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub corners: [(f32, f32); 4],
}

impl Quadrilateral {
    pub fn new(corners: [(f32, f32); 4]) -> Self {
        Self { corners }
    }

    /// Enclosed area, assuming the corners are in boundary order.
    pub fn area(&self) -> f32 {
        let n = self.corners.len();
        let mut area = 0.0f32;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.corners[i].0 * self.corners[j].1;
            area -= self.corners[j].0 * self.corners[i].1;
        }
        area.abs() / 2.0
    }

    /// Whether the polygon `c0 c1 c2 c3` has no crossing edges and non-zero area.
    pub fn is_simple(&self) -> bool {
        let c = &self.corners;
        if self.area() <= f32::EPSILON {
            return false;
        }
        // Only opposite edges can cross in a quadrilateral.
        !segments_cross(c[0], c[1], c[2], c[3]) && !segments_cross(c[1], c[2], c[3], c[0])
    }
}

fn orientation(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Proper crossing of segment `p1-p2` with segment `q1-q2`.
fn segments_cross(p1: (f32, f32), p2: (f32, f32), q1: (f32, f32), q2: (f32, f32)) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// Finds the answer sheet outline in a colour photo.
///
/// ## Pipeline
///
/// 1. Convert to grayscale
/// 2. Gaussian blur to suppress paper texture
/// 3. Canny edge detection
/// 4. Outer contours of the edge map, largest enclosed area first
/// 5. First contour whose polygon approximation has exactly four vertices
pub struct SheetLocator {
    blur_sigma: f32,
    canny_low: f32,
    canny_high: f32,
    /// Approximation tolerance as a fraction of each contour's perimeter.
    polygon_tolerance: f64,
}

impl SheetLocator {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            blur_sigma: config.sheet_blur_sigma,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
            polygon_tolerance: config.polygon_tolerance,
        }
    }

    /// Locate the sheet quadrilateral, or fail with `OmrError::SheetNotFound`.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn locate(&self, image: &RgbImage) -> Result<Quadrilateral, OmrError> {
        let gray = image::imageops::grayscale(image);
        let blurred = gaussian_blur_f32(&gray, self.blur_sigma);
        let edges = canny(&blurred, self.canny_low, self.canny_high);

        let mut candidates: Vec<(f64, Vec<_>)> = external_contours(&edges)
            .into_iter()
            .map(|points| (shoelace_area(&points), points))
            .collect();
        // Stable sort keeps discovery order among equal areas.
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        debug!(contours = candidates.len(), "Edge contours extracted");

        for (area, points) in &candidates {
            let epsilon = self.polygon_tolerance * perimeter(points);
            let approx = approximate_closed_polygon(points, epsilon);
            if approx.len() == 4 {
                let quad = Quadrilateral::new([
                    (approx[0].x as f32, approx[0].y as f32),
                    (approx[1].x as f32, approx[1].y as f32),
                    (approx[2].x as f32, approx[2].y as f32),
                    (approx[3].x as f32, approx[3].y as f32),
                ]);
                info!(area, corners = ?quad.corners, "Sheet outline found");
                return Ok(quad);
            }
        }

        warn!(contours = candidates.len(), "No four-cornered contour found");
        Err(OmrError::SheetNotFound)
    }
}
