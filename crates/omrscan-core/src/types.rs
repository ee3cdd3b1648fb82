// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for omrscan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OmrError, Result};

/// Default minimum number of set pixels for a bubble to count as marked.
pub const DEFAULT_MIN_PIXEL_THRESHOLD: u32 = 500;

/// Highest option count that still maps onto a single letter `A..=Z`.
pub const MAX_OPTIONS: u32 = 26;

/// Text emitted for a question whose winning bubble stayed under the threshold.
pub const NO_RESPONSE: &str = "No Response";

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Axis-aligned bounding box of a detected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// One candidate parameter set of the multi-scale bubble search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Both bounding-box sides must be at least this many pixels.
    pub min_size: u32,
    /// Both bounding-box sides must be at most this many pixels, if set.
    pub max_size: Option<u32>,
    /// Inclusive `(min, max)` range for `width / height`.
    pub aspect_ratio_range: (f64, f64),
}

impl DetectionConfig {
    pub const fn new(min_size: u32, max_size: Option<u32>, aspect_ratio_range: (f64, f64)) -> Self {
        Self {
            min_size,
            max_size,
            aspect_ratio_range,
        }
    }

    /// Whether a bounding box passes the size and aspect-ratio filters.
    pub fn accepts(&self, bbox: &BoundingBox) -> bool {
        if bbox.width == 0 || bbox.height == 0 {
            return false;
        }
        let mut size_ok = bbox.width >= self.min_size && bbox.height >= self.min_size;
        if let Some(max) = self.max_size {
            size_ok = size_ok && bbox.width <= max && bbox.height <= max;
        }
        let ar = bbox.aspect_ratio();
        let (min_ar, max_ar) = self.aspect_ratio_range;
        size_ok && min_ar <= ar && ar <= max_ar
    }
}

/// The decision for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Answer {
    /// The option letter, `'A'` for the leftmost bubble.
    Marked(char),
    /// No bubble in the row exceeded the pixel threshold.
    NoResponse,
}

impl Answer {
    /// Letter answer for a zero-based option index, if it fits in `A..=Z`.
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index)
            .ok()
            .filter(|i| (*i as u32) < MAX_OPTIONS)
            .map(|i| Self::Marked((b'A' + i) as char))
    }

    pub fn is_marked(&self) -> bool {
        matches!(self, Self::Marked(_))
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Marked(letter) => write!(f, "{letter}"),
            Self::NoResponse => f.write_str(NO_RESPONSE),
        }
    }
}

impl From<Answer> for String {
    fn from(answer: Answer) -> Self {
        answer.to_string()
    }
}

impl TryFrom<String> for Answer {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value == NO_RESPONSE {
            return Ok(Self::NoResponse);
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_uppercase() => Ok(Self::Marked(c)),
            _ => Err(format!("not an answer: {value:?}")),
        }
    }
}

/// Scored outcome of one question row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// 1-based question number.
    pub question_index: u32,
    pub selected: Answer,
    /// Normalised margin between the two strongest options, in `[0, 1]`.
    pub confidence: f64,
}

/// Parameters of one `process` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub num_questions: u32,
    pub num_options: u32,
    pub min_pixel_threshold: u32,
    pub debug_mode: bool,
}

impl ScanRequest {
    /// Request with the default pixel threshold and debug output off.
    pub fn new(num_questions: u32, num_options: u32) -> Self {
        Self {
            num_questions,
            num_options,
            min_pixel_threshold: DEFAULT_MIN_PIXEL_THRESHOLD,
            debug_mode: false,
        }
    }

    pub fn with_min_pixel_threshold(mut self, threshold: u32) -> Self {
        self.min_pixel_threshold = threshold;
        self
    }

    pub fn with_debug(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Total number of bubbles the sheet should contain.
    pub fn expected_bubbles(&self) -> usize {
        self.num_questions as usize * self.num_options as usize
    }

    /// Reject non-positive counts before any image work happens.
    pub fn validate(&self) -> Result<()> {
        if self.num_questions == 0 || self.num_options == 0 {
            return Err(OmrError::InvalidParameter(
                "num_questions and num_options must be positive integers".into(),
            ));
        }
        if self.num_options > MAX_OPTIONS {
            return Err(OmrError::InvalidParameter(format!(
                "num_options must be at most {MAX_OPTIONS}, got {}",
                self.num_options
            )));
        }
        if self.min_pixel_threshold == 0 {
            return Err(OmrError::InvalidParameter(
                "min_pixel_threshold must be a positive integer".into(),
            ));
        }
        Ok(())
    }
}

/// Diagnostic data returned alongside the responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub processing_time_seconds: f64,
    /// Dimensions of the decoded input photo.
    pub image_dimensions: ImageDimensions,
    pub bubbles_found: usize,
    pub bubbles_expected: usize,
    pub questions_processed: usize,
    /// Keys are 1-based question numbers, serialised as strings.
    pub confidence_scores: BTreeMap<u32, f64>,
    pub min_pixel_threshold_used: u32,
}

/// Structured output of a successful pipeline run. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Keys are 1-based question numbers, serialised as strings.
    pub responses: BTreeMap<u32, Answer>,
    pub metadata: ProcessingMetadata,
}

impl ProcessingResult {
    /// Number of questions answered with a letter rather than "No Response".
    pub fn answered_count(&self) -> usize {
        self.responses.values().filter(|a| a.is_marked()).count()
    }

    /// Per-question records in question order.
    pub fn records(&self) -> Vec<AnswerRecord> {
        self.responses
            .iter()
            .map(|(&question_index, &selected)| AnswerRecord {
                question_index,
                selected,
                confidence: self
                    .metadata
                    .confidence_scores
                    .get(&question_index)
                    .copied()
                    .unwrap_or(0.0),
            })
            .collect()
    }
}
