// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bubble detector — enumerates size and aspect-ratio filters over the shapes
// of the binary sheet and keeps the filter whose count best matches the
// expected number of bubbles.

use image::GrayImage;
use omrscan_core::error::OmrError;
use omrscan_core::{DetectionConfig, ImageDimensions, ProcessorConfig};
use tracing::{debug, info, instrument, trace, warn};

use crate::bubbles::shape::{Shape, extract_shapes};

/// Which part of the search produced the final selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    /// One of the size/aspect grid combinations.
    Grid,
    /// First fallback tier (lenient filter).
    LenientFallback,
    /// Second fallback tier (most lenient filter).
    AggressiveFallback,
}

/// Outcome of the bubble search.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Accepted shapes in discovery order.
    pub shapes: Vec<Shape>,
    /// Proximity score of `shapes.len()` to the expected count.
    pub score: f64,
    pub config_used: DetectionConfig,
    pub stage: SearchStage,
}

impl DetectionResult {
    pub fn count(&self) -> usize {
        self.shapes.len()
    }
}

/// How close `found` is to `expected`, in `[0, 1]`.
///
/// Linear in the relative error, with a 0.1 bonus when `found` is within
/// 20% of `expected`. Always 0 when nothing is expected.
pub fn proximity_score(found: usize, expected: usize) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    let found = found as f64;
    let expected = expected as f64;
    let base = (1.0 - (found - expected).abs() / expected).clamp(0.0, 1.0);
    let ratio = found / expected;
    let bonus = if (0.8..=1.2).contains(&ratio) { 0.1 } else { 0.0 };
    (base + bonus).clamp(0.0, 1.0)
}

/// Multi-scale bubble search with a two-tier fallback.
pub struct BubbleDetector {
    grid: Vec<DetectionConfig>,
    min_search_score: f64,
    fallback_lenient: DetectionConfig,
    fallback_aggressive: DetectionConfig,
    fallback_retry_ratio: f64,
    default_detection: DetectionConfig,
}

impl BubbleDetector {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            grid: config.search_grid(),
            min_search_score: config.min_search_score,
            fallback_lenient: config.fallback_lenient,
            fallback_aggressive: config.fallback_aggressive,
            fallback_retry_ratio: config.fallback_retry_ratio,
            default_detection: config.default_detection,
        }
    }

    /// Find at least `expected` bubbles on the binary sheet.
    ///
    /// `source` is the size of the decoded photo and is only used to report
    /// `OmrError::InsufficientBubbles`. With `debug_mode` every trial is
    /// logged at debug level instead of trace.
    #[instrument(skip(self, binary), fields(width = binary.width(), height = binary.height()))]
    pub fn detect(
        &self,
        binary: &GrayImage,
        expected: usize,
        source: ImageDimensions,
        debug_mode: bool,
    ) -> Result<DetectionResult, OmrError> {
        let result = self.search(binary, expected, debug_mode);
        if result.count() < expected {
            warn!(found = result.count(), expected, "Not enough bubbles detected");
            return Err(OmrError::InsufficientBubbles {
                found: result.count(),
                expected,
                width: source.width,
                height: source.height,
            });
        }
        info!(
            found = result.count(),
            expected,
            score = result.score,
            stage = ?result.stage,
            "Bubbles detected"
        );
        Ok(result)
    }

    /// Run the grid search and, if it scores too low, the fallback ladder.
    ///
    /// Never fails; the caller decides whether the count is sufficient.
    pub fn search(&self, binary: &GrayImage, expected: usize, debug_mode: bool) -> DetectionResult {
        let candidates = extract_shapes(binary);
        debug!(candidates = candidates.len(), "Shapes extracted from binary sheet");

        let mut best = DetectionResult {
            shapes: Vec::new(),
            score: 0.0,
            config_used: self.default_detection,
            stage: SearchStage::Grid,
        };

        for config in &self.grid {
            let count = candidates.iter().filter(|s| config.accepts(&s.bbox)).count();
            let score = proximity_score(count, expected);
            log_trial(debug_mode, config, count, score);

            if score > best.score {
                best = DetectionResult {
                    shapes: select(&candidates, config),
                    score,
                    config_used: *config,
                    stage: SearchStage::Grid,
                };
            }
        }

        if best.score >= self.min_search_score {
            return best;
        }

        warn!(best_score = best.score, "Grid search scored low; using fallback filters");
        let lenient = select(&candidates, &self.fallback_lenient);
        let score = proximity_score(lenient.len(), expected);
        log_trial(debug_mode, &self.fallback_lenient, lenient.len(), score);

        if (lenient.len() as f64) >= self.fallback_retry_ratio * expected as f64 {
            return DetectionResult {
                shapes: lenient,
                score,
                config_used: self.fallback_lenient,
                stage: SearchStage::LenientFallback,
            };
        }

        let aggressive = select(&candidates, &self.fallback_aggressive);
        let score = proximity_score(aggressive.len(), expected);
        log_trial(debug_mode, &self.fallback_aggressive, aggressive.len(), score);
        DetectionResult {
            shapes: aggressive,
            score,
            config_used: self.fallback_aggressive,
            stage: SearchStage::AggressiveFallback,
        }
    }
}

fn select(candidates: &[Shape], config: &DetectionConfig) -> Vec<Shape> {
    candidates
        .iter()
        .filter(|s| config.accepts(&s.bbox))
        .cloned()
        .collect()
}

fn log_trial(debug_mode: bool, config: &DetectionConfig, found: usize, score: f64) {
    if debug_mode {
        debug!(
            min_size = config.min_size,
            max_size = ?config.max_size,
            aspect = ?config.aspect_ratio_range,
            found,
            score,
            "Detection trial"
        );
    } else {
        trace!(
            min_size = config.min_size,
            max_size = ?config.max_size,
            aspect = ?config.aspect_ratio_range,
            found,
            score,
            "Detection trial"
        );
    }
}
