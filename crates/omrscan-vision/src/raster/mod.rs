// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module — decoding, grayscale conversion and resolution normalisation.

pub mod processor;

pub use processor::SheetImage;
