// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid resolver — groups detected bubbles into question rows.

use crate::bubbles::shape::Shape;

/// The bubbles of one question, left to right.
#[derive(Debug, Clone)]
pub struct QuestionRow<'a> {
    /// 1-based question number.
    pub question: u32,
    pub bubbles: Vec<&'a Shape>,
}

/// Split `shapes` into at most `num_questions` rows of `num_options` bubbles.
///
/// Shapes are ordered by the top edge of their bounding box; each run of
/// `num_options` consecutive shapes forms one row, which is then ordered by
/// the left edge. Both sorts are stable. Shapes that do not fill a whole row,
/// and rows beyond `num_questions`, are dropped.
pub fn resolve_rows(
    shapes: &[Shape],
    num_questions: u32,
    num_options: u32,
) -> Vec<QuestionRow<'_>> {
    if num_options == 0 {
        return Vec::new();
    }
    let per_row = num_options as usize;

    let mut by_top: Vec<&Shape> = shapes.iter().collect();
    by_top.sort_by_key(|s| s.bbox.y);

    let rows = (num_questions as usize).min(by_top.len() / per_row);
    by_top
        .chunks_exact(per_row)
        .take(rows)
        .zip(1u32..)
        .map(|(chunk, question)| {
            let mut bubbles = chunk.to_vec();
            bubbles.sort_by_key(|s| s.bbox.x);
            QuestionRow { question, bubbles }
        })
        .collect()
}
