// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the person holding the camera.
//
// Every technical error is mapped to plain English with a concrete next step
// (re-photograph, crop differently, check the grid size). The error class
// tells a caller which kind of failure response to give.

use crate::error::OmrError;

/// Who has to act on an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is malformed (bad bytes, bad parameters, bad upload).
    ClientInput,
    /// The request was well-formed but the photo could not be graded.
    Unprocessable,
    /// Too many requests; the same request will succeed later.
    Throttled,
    /// Something failed on our side.
    Internal,
}

impl ErrorClass {
    /// The HTTP status a web front-end would answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ClientInput => 400,
            Self::Unprocessable => 422,
            Self::Throttled => 429,
            Self::Internal => 500,
        }
    }
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try next.
    pub suggestion: String,
    /// Whether resubmitting the same request could succeed.
    pub retriable: bool,
    pub class: ErrorClass,
}

/// Convert an `OmrError` into a `HumanError` someone grading a stack of
/// sheets on a phone can act on.
pub fn humanize_error(err: &OmrError) -> HumanError {
    match err {
        OmrError::InvalidParameter(detail) => HumanError {
            message: "The answer grid settings aren't valid.".into(),
            suggestion: format!(
                "Enter a positive number of questions, options (at most 26) \
                 and pixel threshold. ({detail})"
            ),
            retriable: false,
            class: ErrorClass::ClientInput,
        },

        OmrError::Decode(_) => HumanError {
            message: "This file isn't a readable picture.".into(),
            suggestion: "Take the photo again and upload it as a JPEG, PNG or BMP.".into(),
            retriable: false,
            class: ErrorClass::ClientInput,
        },

        OmrError::Validation(detail) => HumanError {
            message: "This upload can't be accepted.".into(),
            suggestion: format!("Upload a JPEG, PNG or BMP photo under the size limit. ({detail})"),
            retriable: false,
            class: ErrorClass::ClientInput,
        },

        OmrError::SheetNotFound => HumanError {
            message: "We couldn't find the answer sheet in the photo.".into(),
            suggestion: "Photograph the whole sheet on a darker surface in good light, \
                         with all four corners visible."
                .into(),
            retriable: false,
            class: ErrorClass::Unprocessable,
        },

        OmrError::InsufficientBubbles { found, expected, .. } => HumanError {
            message: "Some answer bubbles couldn't be found.".into(),
            suggestion: format!(
                "We found {found} of {expected} bubbles. \
                 Check the number of questions and options, \
                 and retake the photo closer and without shadows."
            ),
            retriable: false,
            class: ErrorClass::Unprocessable,
        },

        OmrError::RateLimited { .. } => HumanError {
            message: "Too many sheets were sent in a short time.".into(),
            suggestion: "Wait a minute, then send the sheet again.".into(),
            retriable: true,
            class: ErrorClass::Throttled,
        },

        OmrError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The image file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the path and try again."
                        .into(),
                    retriable: false,
                    class: ErrorClass::ClientInput,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, \
                                 check disk space and permissions."
                        .into(),
                    retriable: true,
                    class: ErrorClass::Internal,
                }
            }
        }

        OmrError::Serialization(_) => HumanError {
            message: "The results couldn't be written out.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            class: ErrorClass::Internal,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_not_found_is_unprocessable() {
        let human = humanize_error(&OmrError::SheetNotFound);
        assert_eq!(human.class, ErrorClass::Unprocessable);
        assert_eq!(human.class.http_status(), 422);
        assert!(!human.retriable);
    }

    #[test]
    fn decode_is_client_input() {
        let human = humanize_error(&OmrError::Decode("bad magic".into()));
        assert_eq!(human.class, ErrorClass::ClientInput);
        assert_eq!(human.class.http_status(), 400);
    }

    #[test]
    fn insufficient_bubbles_mentions_counts() {
        let human = humanize_error(&OmrError::InsufficientBubbles {
            found: 12,
            expected: 20,
            width: 800,
            height: 600,
        });
        assert!(human.suggestion.contains("12 of 20"));
    }

    #[test]
    fn rate_limited_is_retriable() {
        let human = humanize_error(&OmrError::RateLimited {
            minute_count: 61,
            hour_count: 61,
        });
        assert_eq!(human.class, ErrorClass::Throttled);
        assert!(human.retriable);
    }

    #[test]
    fn missing_file_is_client_input() {
        let err = OmrError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert_eq!(humanize_error(&err).class, ErrorClass::ClientInput);
    }
}
