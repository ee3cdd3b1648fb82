// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic answer-sheet photos for tests and benchmarks.
//
// The sheet is mid-grey paper on a white background. A black header block
// covers most of the paper, so ink is the majority class after thresholding
// and the binarizer keeps ink as foreground. Below the header sit the bubble
// rows: unmarked bubbles are 2 px ink rings, marked bubbles are solid ink disks.

use std::collections::BTreeMap;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use omrscan_core::Answer;
use omrscan_core::error::OmrError;

use crate::raster::SheetImage;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const PAPER: Rgb<u8> = Rgb([90, 90, 90]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

const PHOTO_BORDER: u32 = 40;
const MARGIN: u32 = 20;
const HEADER_GAP: u32 = 30;
const ROW_PITCH: u32 = 36;
const COLUMN_PITCH: u32 = 60;
const FIRST_COLUMN: u32 = 120;
const BUBBLE_RADIUS: i32 = 11;
const RING_INNER_RADIUS: i32 = 9;
/// Default paper side; large enough that the default pipeline does not resize.
pub const DEFAULT_PAPER_SIZE: u32 = 1240;
/// Share of the paper the header must cover.
const HEADER_SHARE: f64 = 0.56;

/// Builder for a photographed answer sheet with a known key.
#[derive(Debug, Clone)]
pub struct SyntheticSheet {
    num_questions: u32,
    num_options: u32,
    /// Marked option per question, zero-based.
    marks: Vec<Option<u32>>,
    width: u32,
    min_height: u32,
}

impl SyntheticSheet {
    /// Blank sheet with the given grid on `DEFAULT_PAPER_SIZE` paper.
    pub fn new(num_questions: u32, num_options: u32) -> Self {
        Self {
            num_questions,
            num_options,
            marks: vec![None; num_questions as usize],
            width: DEFAULT_PAPER_SIZE,
            min_height: DEFAULT_PAPER_SIZE,
        }
    }

    /// Fill in `option` (zero-based) for `question` (zero-based).
    pub fn mark(mut self, question: u32, option: u32) -> Self {
        if let Some(slot) = self.marks.get_mut(question as usize) {
            *slot = Some(option.min(self.num_options.saturating_sub(1)));
        }
        self
    }

    /// Mark every question from an answer key; `None` leaves it blank.
    pub fn with_key(mut self, key: &[Option<u32>]) -> Self {
        for (question, option) in key.iter().enumerate() {
            if let Some(option) = option {
                self = self.mark(question as u32, *option);
            }
        }
        self
    }

    /// Paper width and minimum paper height in pixels.
    ///
    /// The width grows if the options do not fit and the height grows with
    /// the number of questions.
    pub fn with_size(mut self, width: u32, min_height: u32) -> Self {
        self.width = width;
        self.min_height = min_height;
        self
    }

    /// The responses a correct grader reports for this sheet.
    pub fn expected_responses(&self) -> BTreeMap<u32, Answer> {
        self.marks
            .iter()
            .zip(1u32..)
            .map(|(mark, question)| {
                let answer = mark
                    .and_then(|o| Answer::from_index(o as usize))
                    .unwrap_or(Answer::NoResponse);
                (question, answer)
            })
            .collect()
    }

    fn paper_width(&self) -> u32 {
        let needed = FIRST_COLUMN + self.num_options * COLUMN_PITCH + 2 * MARGIN;
        self.width.max(needed)
    }

    /// Header height so that the header covers `HEADER_SHARE` of the paper.
    fn header_height(&self, width: u32) -> u32 {
        let block = self.bubble_block_height() as f64;
        let w = width as f64;
        let m = MARGIN as f64;
        let needed =
            (HEADER_SHARE * w * (m + block) / ((1.0 - HEADER_SHARE) * w - 2.0 * m)).ceil() as u32;
        let fill = self.min_height.saturating_sub(MARGIN + self.bubble_block_height());
        needed.max(fill)
    }

    fn bubble_block_height(&self) -> u32 {
        HEADER_GAP + self.num_questions * ROW_PITCH + MARGIN
    }

    /// Render the sheet on its background.
    pub fn render(&self) -> RgbImage {
        let width = self.paper_width();
        let header = self.header_height(width);
        let height = MARGIN + header + self.bubble_block_height();

        let mut photo = RgbImage::from_pixel(
            width + 2 * PHOTO_BORDER,
            height + 2 * PHOTO_BORDER,
            BACKGROUND,
        );
        let (ox, oy) = (PHOTO_BORDER as i32, PHOTO_BORDER as i32);
        draw_filled_rect_mut(&mut photo, Rect::at(ox, oy).of_size(width, height), PAPER);
        draw_filled_rect_mut(
            &mut photo,
            Rect::at(ox + MARGIN as i32, oy + MARGIN as i32).of_size(width - 2 * MARGIN, header),
            INK,
        );

        let first_row = oy + (MARGIN + header + HEADER_GAP) as i32 + BUBBLE_RADIUS;
        for (question, mark) in self.marks.iter().enumerate() {
            let cy = first_row + question as i32 * ROW_PITCH as i32;
            for option in 0..self.num_options {
                let cx = ox + (FIRST_COLUMN + option * COLUMN_PITCH) as i32;
                draw_filled_circle_mut(&mut photo, (cx, cy), BUBBLE_RADIUS, INK);
                if *mark != Some(option) {
                    draw_filled_circle_mut(&mut photo, (cx, cy), RING_INNER_RADIUS, PAPER);
                }
            }
        }
        photo
    }

    /// Render and encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, OmrError> {
        SheetImage::from_dynamic(DynamicImage::ImageRgb8(self.render())).to_png_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ink_share(sheet: &SyntheticSheet) -> f64 {
        let photo = sheet.render();
        let (w, h) = photo.dimensions();
        let mut ink = 0usize;
        let mut paper = 0usize;
        for y in PHOTO_BORDER..h - PHOTO_BORDER {
            for x in PHOTO_BORDER..w - PHOTO_BORDER {
                if *photo.get_pixel(x, y) == INK {
                    ink += 1;
                } else {
                    paper += 1;
                }
            }
        }
        ink as f64 / (ink + paper) as f64
    }

    #[test]
    fn ink_is_the_majority_of_the_paper() {
        assert!(ink_share(&SyntheticSheet::new(10, 4)) > 0.55);
        assert!(ink_share(&SyntheticSheet::new(3, 5).with_size(620, 620)) > 0.55);
    }

    #[test]
    fn size_request_sets_the_paper_size() {
        let photo = SyntheticSheet::new(10, 4).with_size(1240, 1240).render();
        assert_eq!(photo.width(), 1240 + 2 * PHOTO_BORDER);
        assert!(photo.height() >= 1240 + 2 * PHOTO_BORDER);
    }

    #[test]
    fn expected_responses_follow_the_key() {
        let sheet = SyntheticSheet::new(3, 4).with_key(&[Some(1), None, Some(3)]);
        let expected = sheet.expected_responses();
        assert_eq!(expected[&1], Answer::Marked('B'));
        assert_eq!(expected[&2], Answer::NoResponse);
        assert_eq!(expected[&3], Answer::Marked('D'));
    }

    #[test]
    fn marked_bubble_is_solid() {
        let sheet = SyntheticSheet::new(1, 2).mark(0, 1);
        let photo = sheet.render();
        let header = sheet.header_height(sheet.paper_width());
        let cy = PHOTO_BORDER + MARGIN + header + HEADER_GAP + BUBBLE_RADIUS as u32;
        let blank_cx = PHOTO_BORDER + FIRST_COLUMN;
        let marked_cx = blank_cx + COLUMN_PITCH;
        assert_eq!(*photo.get_pixel(blank_cx, cy), PAPER);
        assert_eq!(*photo.get_pixel(marked_cx, cy), INK);
    }
}
