// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour helpers shared by the sheet locator and the bubble detector.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use omrscan_core::BoundingBox;

/// Outer borders of all top-level foreground components.
///
/// Borders nested inside a hole of another component are skipped, so a
/// filled region and everything drawn inside it yield a single contour.
pub fn external_contours(image: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(image)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .filter(|points| !points.is_empty())
        .collect()
}

/// Inclusive pixel bounding box of a contour.
///
/// Non-empty contours always yield width and height >= 1.
pub fn bounding_box(points: &[Point<i32>]) -> BoundingBox {
    if points.is_empty() {
        return BoundingBox {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    BoundingBox {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    }
}

/// Area enclosed by a closed polygon, via the shoelace formula.
pub fn shoelace_area(points: &[Point<i32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    area.abs() / 2.0
}

/// Perimeter of a closed contour.
pub fn perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    arc_length(points, true)
}

/// Douglas–Peucker simplification of a closed contour.
///
/// The contour is split at its first point and at the point farthest from
/// it; each half is simplified as an open polyline and the halves are joined
/// without repeating their shared endpoints.
pub fn approximate_closed_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }

    let start = points[0];
    let far = points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| {
            let dx = (p.x - start.x) as i64;
            let dy = (p.y - start.y) as i64;
            dx * dx + dy * dy
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return vec![start];
    }

    let first_half = &points[..=far];
    let mut second_half: Vec<Point<i32>> = points[far..].to_vec();
    second_half.push(start);

    let mut polygon = approximate_polygon_dp(first_half, epsilon, false);
    let tail = approximate_polygon_dp(&second_half, epsilon, false);
    // Drop the shared far point and the closing copy of the start point.
    if tail.len() > 2 {
        polygon.extend_from_slice(&tail[1..tail.len() - 1]);
    }
    polygon
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use imageproc::rect::Rect;

    fn square_outline(x0: i32, y0: i32, side: i32) -> Vec<Point<i32>> {
        let mut pts = Vec::new();
        for x in x0..x0 + side {
            pts.push(Point::new(x, y0));
        }
        for y in y0..y0 + side {
            pts.push(Point::new(x0 + side, y));
        }
        for x in (x0 + 1..=x0 + side).rev() {
            pts.push(Point::new(x, y0 + side));
        }
        for y in (y0 + 1..=y0 + side).rev() {
            pts.push(Point::new(x0, y));
        }
        pts
    }

    #[test]
    fn shoelace_area_rectangle() {
        let corners = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 5),
            Point::new(0, 5),
        ];
        let area = shoelace_area(&corners);
        assert!((area - 50.0).abs() < 1e-9, "Expected 50.0, got {}", area);
    }

    #[test]
    fn square_outline_simplifies_to_four_corners() {
        let outline = square_outline(10, 10, 100);
        let eps = 0.02 * perimeter(&outline);
        let poly = approximate_closed_polygon(&outline, eps);
        assert_eq!(poly.len(), 4, "got {:?}", poly);
        assert!(poly.contains(&Point::new(10, 10)));
        assert!(poly.contains(&Point::new(110, 110)));
    }

    #[test]
    fn nested_components_are_not_external() {
        let mut img = GrayImage::new(120, 120);
        // Ring with a dot inside its hole.
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(100, 100), Luma([255u8]));
        draw_filled_rect_mut(&mut img, Rect::at(20, 20).of_size(80, 80), Luma([0u8]));
        draw_filled_circle_mut(&mut img, (60, 60), 5, Luma([255u8]));

        let contours = external_contours(&img);
        assert_eq!(contours.len(), 1);
        let bbox = bounding_box(&contours[0]);
        assert_eq!(
            bbox,
            BoundingBox {
                x: 10,
                y: 10,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn separate_blobs_each_get_a_contour() {
        let mut img = GrayImage::new(100, 40);
        for cx in [15, 50, 85] {
            draw_filled_circle_mut(&mut img, (cx, 20), 8, Luma([255u8]));
        }
        let contours = external_contours(&img);
        assert_eq!(contours.len(), 3);
        for c in &contours {
            let bbox = bounding_box(c);
            assert_eq!((bbox.width, bbox.height), (17, 17));
        }
    }
}
