// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end grading: photo bytes in, per-question answers out.

use std::collections::BTreeMap;
use std::time::Instant;

use omrscan_core::error::OmrError;
use omrscan_core::{ProcessingMetadata, ProcessingResult, ProcessorConfig, ScanRequest};
use tracing::{debug, info, instrument};

use crate::bubbles::{AnswerScorer, BubbleDetector, resolve_rows};
use crate::raster::SheetImage;
use crate::scan::Binarizer;
use crate::sheet::{PerspectiveNormalizer, SheetLocator};

/// Grade a photographed answer sheet with the default pipeline settings.
///
/// Parameters are checked before the image is decoded; any failure aborts
/// the whole run without partial results.
pub fn process(
    image_bytes: &[u8],
    num_questions: u32,
    num_options: u32,
    min_pixel_threshold: u32,
    debug_mode: bool,
) -> Result<ProcessingResult, OmrError> {
    let request = ScanRequest::new(num_questions, num_options)
        .with_min_pixel_threshold(min_pixel_threshold)
        .with_debug(debug_mode);
    process_with(&ProcessorConfig::default(), image_bytes, &request)
}

/// Grade a photographed answer sheet with explicit pipeline settings.
///
/// ## Stages
///
/// 1. Decode
/// 2. Locate the sheet outline
/// 3. Warp it upright and upscale to the working resolution
/// 4. Binarize
/// 5. Search for bubbles
/// 6. Group bubbles into rows and score each row
#[instrument(
    skip(config, image_bytes),
    fields(
        data_len = image_bytes.len(),
        questions = request.num_questions,
        options = request.num_options,
    )
)]
pub fn process_with(
    config: &ProcessorConfig,
    image_bytes: &[u8],
    request: &ScanRequest,
) -> Result<ProcessingResult, OmrError> {
    let started = Instant::now();
    request.validate()?;

    let photo = SheetImage::from_bytes(image_bytes)?;
    let source = photo.dimensions();
    let rgb = photo.to_rgb8();

    let quad = SheetLocator::new(config).locate(&rgb)?;
    let sheet = PerspectiveNormalizer::new(config).normalize(&rgb, &quad)?;
    let binary = Binarizer::new(config).binarize(&sheet);

    let expected = request.expected_bubbles();
    let detection =
        BubbleDetector::new(config).detect(&binary, expected, source, request.debug_mode)?;

    if request.debug_mode {
        let widths = detection.shapes.iter().map(|s| s.bbox.width);
        debug!(
            found = detection.count(),
            expected,
            source_width = source.width,
            source_height = source.height,
            min_bubble_width = widths.clone().min().unwrap_or(0),
            max_bubble_width = widths.max().unwrap_or(0),
            config = ?detection.config_used,
            "Detection summary"
        );
    }

    let rows = resolve_rows(&detection.shapes, request.num_questions, request.num_options);
    let scorer = AnswerScorer::new(request.min_pixel_threshold);

    let mut responses = BTreeMap::new();
    let mut confidence_scores = BTreeMap::new();
    for row in &rows {
        let record = scorer.score_row(&binary, row);
        responses.insert(record.question_index, record.selected);
        confidence_scores.insert(record.question_index, record.confidence);
    }

    let elapsed = started.elapsed().as_secs_f64();
    let result = ProcessingResult {
        responses,
        metadata: ProcessingMetadata {
            processing_time_seconds: (elapsed * 1000.0).round() / 1000.0,
            image_dimensions: source,
            bubbles_found: detection.count(),
            bubbles_expected: expected,
            questions_processed: rows.len(),
            confidence_scores,
            min_pixel_threshold_used: request.min_pixel_threshold,
        },
    };

    info!(
        questions_processed = rows.len(),
        answered = result.answered_count(),
        elapsed,
        "Sheet graded"
    );
    Ok(result)
}
