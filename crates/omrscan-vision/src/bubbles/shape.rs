// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use image::GrayImage;
use imageproc::point::Point;
use omrscan_core::BoundingBox;

use crate::contour::{bounding_box, external_contours};

/// An outer contour of the binary sheet together with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub points: Vec<Point<i32>>,
    pub bbox: BoundingBox,
}

impl Shape {
    pub fn from_contour(points: Vec<Point<i32>>) -> Self {
        let bbox = bounding_box(&points);
        Self { points, bbox }
    }
}

/// Every top-level shape of a binary image, in discovery order.
pub fn extract_shapes(binary: &GrayImage) -> Vec<Shape> {
    external_contours(binary)
        .into_iter()
        .map(Shape::from_contour)
        .collect()
}
