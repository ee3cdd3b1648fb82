// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload validation: size limit, format signature and header sanity, plus
// filename checks.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use omrscan_core::error::{OmrError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Longest accepted filename in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/bmp",
    "multipart/form-data",
];

/// Fragments that never appear in an honest photo filename.
const SUSPICIOUS_FRAGMENTS: &[&str] = &[
    "<script",
    "javascript:",
    "vbscript:",
    "data:text/html",
    "data:application/x-javascript",
];

/// Accepted upload encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Jpeg,
    Png,
    Bmp,
}

impl ImageKind {
    /// Identify the encoding from the leading signature bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(b"BM") {
            Some(Self::Bmp)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Bmp => "image/bmp",
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

/// Check an upload before it reaches the pipeline.
///
/// Rejects files over `max_size_mb` MiB, files without a JPEG, PNG or BMP
/// signature, and files whose header cannot be read.
pub fn validate_image(bytes: &[u8], max_size_mb: u64) -> Result<ImageKind> {
    let size_mb = bytes.len() as f64 / BYTES_PER_MB;
    if size_mb > max_size_mb as f64 {
        warn!(size_mb, max_size_mb, "Upload too large");
        return Err(OmrError::Validation(format!(
            "File size ({size_mb:.2}MB) exceeds maximum allowed size ({max_size_mb}MB)"
        )));
    }

    let kind = ImageKind::sniff(bytes).ok_or_else(|| {
        warn!("Unknown file signature");
        OmrError::Validation("Unsupported file type. Allowed types: JPG, PNG, BMP".into())
    })?;

    let (width, height) = ImageReader::with_format(Cursor::new(bytes), kind.format())
        .into_dimensions()
        .map_err(|err| OmrError::Validation(format!("Invalid image file: {err}")))?;
    if width == 0 || height == 0 {
        return Err(OmrError::Validation("Invalid image file: zero-sized image".into()));
    }

    debug!(?kind, width, height, "Upload accepted");
    Ok(kind)
}

/// Check a client-supplied filename.
pub fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(OmrError::Validation("Filename is empty".into()));
    }
    if name.len() > MAX_FILENAME_LEN {
        return Err(OmrError::Validation(format!(
            "Filename is longer than {MAX_FILENAME_LEN} bytes"
        )));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        warn!(filename = name, "Path traversal attempt in filename");
        return Err(OmrError::Validation("Filename must not contain a path".into()));
    }
    if name.chars().any(char::is_control) {
        return Err(OmrError::Validation("Filename contains control characters".into()));
    }

    let lower = name.to_ascii_lowercase();
    if SUSPICIOUS_FRAGMENTS.iter().any(|f| lower.contains(f)) {
        warn!(filename = name, "Suspicious filename");
        return Err(OmrError::Validation("Invalid filename detected".into()));
    }

    match lower.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ALLOWED_EXTENSIONS.contains(&ext) => Ok(()),
        _ => Err(OmrError::Validation(
            "Filename must end in .jpg, .jpeg, .png or .bmp".into(),
        )),
    }
}

/// Check a declared upload content type (case-insensitive).
pub fn validate_content_type(content_type: &str) -> Result<()> {
    let lower = content_type.trim().to_ascii_lowercase();
    if ALLOWED_CONTENT_TYPES.contains(&lower.as_str()) {
        Ok(())
    } else {
        Err(OmrError::Validation(format!("Invalid content type: {content_type}")))
    }
}
