// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer scorer — counts marked pixels inside each bubble of a row and picks
// the answer.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use omrscan_core::{Answer, AnswerRecord};
use tracing::trace;

use crate::bubbles::grid::QuestionRow;
use crate::bubbles::shape::Shape;

/// Number of set pixels of `binary` inside the filled contour of `shape`.
///
/// The contour outline itself counts as inside.
pub fn count_marked_pixels(binary: &GrayImage, shape: &Shape) -> u32 {
    let bbox = shape.bbox;
    if bbox.width == 0 || bbox.height == 0 {
        return 0;
    }

    let mut mask = GrayImage::new(bbox.width, bbox.height);
    let local: Vec<Point<i32>> = shape
        .points
        .iter()
        .map(|p| Point::new(p.x - bbox.x as i32, p.y - bbox.y as i32))
        .collect();

    let mut polygon: &[Point<i32>] = &local;
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon = &polygon[..polygon.len() - 1];
    }
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut mask, polygon, Luma([255u8]));
    }
    for p in &local {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < bbox.width && (p.y as u32) < bbox.height {
            mask.put_pixel(p.x as u32, p.y as u32, Luma([255u8]));
        }
    }

    let mut count = 0;
    for (mx, my, m) in mask.enumerate_pixels() {
        if m[0] == 0 {
            continue;
        }
        let (x, y) = (bbox.x + mx, bbox.y + my);
        if x < binary.width() && y < binary.height() && binary.get_pixel(x, y)[0] != 0 {
            count += 1;
        }
    }
    count
}

/// Margin of the strongest count over the runner-up, relative to the strongest.
///
/// 1.0 for a single option, 0.0 when nothing is marked; rounded to three
/// decimals.
pub fn confidence(counts: &[u32]) -> f64 {
    let mut sorted = counts.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    match sorted.as_slice() {
        [] => 0.0,
        [_] => 1.0,
        [0, ..] => 0.0,
        [top1, top2, ..] => {
            let margin = (*top1 - *top2) as f64 / *top1 as f64;
            (margin * 1000.0).round() / 1000.0
        }
    }
}

/// Index of the largest count; the first one wins ties.
fn argmax(counts: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, &c) in counts.iter().enumerate() {
        if best.is_none_or(|(_, b)| c > b) {
            best = Some((i, c));
        }
    }
    best.map(|(i, _)| i)
}

/// Turns question rows into answer records.
pub struct AnswerScorer {
    min_pixel_threshold: u32,
}

impl AnswerScorer {
    pub fn new(min_pixel_threshold: u32) -> Self {
        Self {
            min_pixel_threshold,
        }
    }

    /// Score one row: the winning bubble must exceed the pixel threshold.
    pub fn score_row(&self, binary: &GrayImage, row: &QuestionRow<'_>) -> AnswerRecord {
        let counts: Vec<u32> = row
            .bubbles
            .iter()
            .map(|shape| count_marked_pixels(binary, shape))
            .collect();

        let selected = match argmax(&counts) {
            Some(index) if counts[index] > self.min_pixel_threshold => {
                Answer::from_index(index).unwrap_or(Answer::NoResponse)
            }
            _ => Answer::NoResponse,
        };
        let confidence = confidence(&counts);
        trace!(question = row.question, ?counts, %selected, confidence, "Row scored");

        AnswerRecord {
            question_index: row.question,
            selected,
            confidence,
        }
    }
}
