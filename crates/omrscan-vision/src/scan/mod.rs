// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan processing: contrast equalisation and binarisation of the upright sheet.

pub mod binarize;
pub mod clahe;

pub use binarize::Binarizer;
pub use clahe::equalize_adaptive;
