// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for omrscan.

use thiserror::Error;

/// Top-level error type for all omrscan operations.
///
/// Every pipeline failure is terminal for the invocation: no variant ever
/// travels alongside a partially populated result.
#[derive(Debug, Error)]
pub enum OmrError {
    // -- Input errors --
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("could not decode image bytes: {0}")]
    Decode(String),

    #[error("upload rejected: {0}")]
    Validation(String),

    // -- Pipeline errors --
    #[error("could not find the answer sheet outline in the image")]
    SheetNotFound,

    #[error(
        "found {found} bubbles, but expected {expected} (image dimensions: {width}x{height}); \
         check bubble size, lighting, and sheet format"
    )]
    InsufficientBubbles {
        found: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    // -- Service errors --
    #[error("rate limit exceeded ({minute_count} requests this minute, {hour_count} this hour)")]
    RateLimited {
        minute_count: usize,
        hour_count: usize,
    },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OmrError>;
