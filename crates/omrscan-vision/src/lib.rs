// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// omrscan-vision — Optical mark recognition for photographed answer sheets.
//
// Provides the full grading pipeline: decoding, sheet localisation, perspective
// normalisation, binarisation, multi-scale bubble detection, row grouping and
// per-question answer scoring.

pub mod bubbles;
mod contour;
pub mod pipeline;
pub mod raster;
pub mod scan;
pub mod sheet;
pub mod synthetic;

// Re-export the primary entry points so callers can use `omrscan_vision::process` etc.
pub use bubbles::detect::{BubbleDetector, DetectionResult};
pub use pipeline::{process, process_with};
pub use raster::processor::SheetImage;
pub use scan::binarize::Binarizer;
pub use sheet::locate::SheetLocator;
pub use synthetic::SyntheticSheet;
