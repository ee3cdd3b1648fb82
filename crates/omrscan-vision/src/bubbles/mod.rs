// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bubble stage: shape search on the binary sheet, grouping into question rows,
// and per-row answer scoring.

pub mod detect;
pub mod grid;
pub mod score;
pub mod shape;

pub use detect::{BubbleDetector, DetectionResult, SearchStage, proximity_score};
pub use grid::{QuestionRow, resolve_rows};
pub use score::AnswerScorer;
pub use shape::Shape;
