// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline and service configuration.

use serde::{Deserialize, Serialize};

use crate::types::DetectionConfig;

/// Tunable constants of the image-analysis pipeline.
///
/// Changing the search grid or the score cut-off changes which sheets fall
/// through to the coarse fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    // -- Sheet locator --
    /// Gaussian sigma applied before edge detection (5x5 kernel equivalent).
    pub sheet_blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub polygon_tolerance: f64,

    // -- Perspective normalizer --
    /// Both sides of the warped sheet are upscaled to at least this many pixels.
    pub min_dimension: u32,

    // -- Binarizer --
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid is `clahe_tiles x clahe_tiles`.
    pub clahe_tiles: u32,
    /// Gaussian sigma applied after CLAHE (3x3 kernel equivalent).
    pub binarize_blur_sigma: f32,
    /// Side of the elliptical kernel used for opening and closing; 0 skips
    /// all morphology.
    pub morph_kernel_size: u8,
    /// Side of the elliptical kernel of the final erosion; 1 leaves the
    /// image unchanged.
    pub erode_kernel_size: u8,

    // -- Bubble detector --
    /// `(min, max)` bubble side lengths, tried in order.
    pub size_ranges: Vec<(u32, u32)>,
    /// `(min, max)` aspect ratios, tried in order for each size range.
    pub aspect_ratio_ranges: Vec<(f64, f64)>,
    /// Best grid score below this triggers the coarse fallback.
    pub min_search_score: f64,
    /// Lenient filter used first by the fallback.
    pub fallback_lenient: DetectionConfig,
    /// More lenient filter, used when the first tier finds too few shapes.
    pub fallback_aggressive: DetectionConfig,
    /// The second tier runs when the first finds fewer than this share of the expected count.
    pub fallback_retry_ratio: f64,
    /// Parameters reported when no grid combination finds anything.
    pub default_detection: DetectionConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sheet_blur_sigma: 1.1,
            canny_low: 75.0,
            canny_high: 200.0,
            polygon_tolerance: 0.02,
            min_dimension: 1200,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            binarize_blur_sigma: 0.8,
            morph_kernel_size: 2,
            erode_kernel_size: 1,
            size_ranges: vec![
                (4, 12),
                (6, 15),
                (8, 18),
                (10, 22),
                (12, 25),
                (15, 30),
                (18, 35),
            ],
            aspect_ratio_ranges: vec![(0.5, 1.5), (0.7, 1.3), (0.8, 1.2), (0.9, 1.1)],
            min_search_score: 0.3,
            fallback_lenient: DetectionConfig::new(4, None, (0.5, 1.5)),
            fallback_aggressive: DetectionConfig::new(3, None, (0.3, 2.0)),
            fallback_retry_ratio: 0.5,
            default_detection: DetectionConfig::new(10, Some(25), (0.5, 1.5)),
        }
    }
}

impl ProcessorConfig {
    /// Every size/aspect combination in search order (size outer, aspect inner).
    pub fn search_grid(&self) -> Vec<DetectionConfig> {
        self.size_ranges
            .iter()
            .flat_map(|&(min_size, max_size)| {
                self.aspect_ratio_ranges
                    .iter()
                    .map(move |&ar| DetectionConfig::new(min_size, Some(max_size), ar))
            })
            .collect()
    }
}

/// Settings of the upload validation, rate limiting and result storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Largest accepted upload in MiB.
    pub max_upload_mb: u64,
    pub requests_per_minute: usize,
    pub requests_per_hour: usize,
    /// Stored results are dropped this many hours after creation.
    pub result_expiration_hours: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 10,
            requests_per_minute: 60,
            requests_per_hour: 1000,
            result_expiration_hours: 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_has_twenty_eight_combinations_in_order() {
        let grid = ProcessorConfig::default().search_grid();
        assert_eq!(grid.len(), 28);
        assert_eq!(grid[0], DetectionConfig::new(4, Some(12), (0.5, 1.5)));
        assert_eq!(grid[1], DetectionConfig::new(4, Some(12), (0.7, 1.3)));
        assert_eq!(grid[4], DetectionConfig::new(6, Some(15), (0.5, 1.5)));
        assert_eq!(grid[27], DetectionConfig::new(18, Some(35), (0.9, 1.1)));
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = ProcessorConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ProcessorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let cfg: ProcessorConfig = serde_json::from_str(r#"{"min_dimension": 600}"#).unwrap();
        assert_eq!(cfg.min_dimension, 600);
        assert_eq!(cfg.search_grid(), ProcessorConfig::default().search_grid());

        let svc: ServiceConfig = serde_json::from_str(r#"{"requests_per_minute": 5}"#).unwrap();
        assert_eq!(svc.requests_per_minute, 5);
        assert_eq!(svc.result_expiration_hours, 24);
    }
}
