// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet module — find the answer sheet in a photo and warp it upright.

pub mod locate;
pub mod normalize;

pub use locate::{Quadrilateral, SheetLocator};
pub use normalize::PerspectiveNormalizer;
