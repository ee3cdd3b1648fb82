// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// omrscan-service — the state and checks a grading front-end wraps around
// the pipeline: upload validation, per-client rate limiting and a short-lived
// result store.

pub mod rate_limit;
pub mod store;
pub mod validation;

pub use rate_limit::{RateDecision, RateLimiter, client_key};
pub use store::{ResultId, ResultStore, StoreStats, StoredResult};
pub use validation::{ImageKind, validate_content_type, validate_filename, validate_image};
