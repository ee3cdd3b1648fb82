// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory result store with expiry.
//
// Graded sheets are kept for a fixed number of hours so a client can fetch
// them again by id. Expired entries are removed lazily on lookup and in bulk
// by `cleanup_expired`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use omrscan_core::error::OmrError;
use omrscan_core::{ProcessingResult, ServiceConfig};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Unique identifier of a stored result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultId(pub Uuid);

impl ResultId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResultId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResultId {
    type Err = OmrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|err| OmrError::Validation(format!("invalid result id {s:?}: {err}")))
    }
}

/// A graded sheet as kept by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub filename: String,
    /// When the sheet was graded.
    pub timestamp: DateTime<Utc>,
    pub result: ProcessingResult,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredResult {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Snapshot of the store's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub expiration_hours: i64,
}

/// Thread-safe map from `ResultId` to `StoredResult`.
pub struct ResultStore {
    expiration_hours: i64,
    entries: Mutex<HashMap<ResultId, StoredResult>>,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

impl ResultStore {
    pub fn new(expiration_hours: i64) -> Self {
        Self {
            expiration_hours,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.result_expiration_hours)
    }

    /// Keep `result` under a fresh id, timestamped now.
    pub fn store(&self, filename: &str, result: ProcessingResult) -> ResultId {
        self.store_at(filename, result, Utc::now())
    }

    pub fn store_at(
        &self,
        filename: &str,
        result: ProcessingResult,
        now: DateTime<Utc>,
    ) -> ResultId {
        let id = ResultId::new();
        let entry = StoredResult {
            filename: filename.to_string(),
            timestamp: now,
            result,
            created_at: now,
            expires_at: now + TimeDelta::hours(self.expiration_hours),
        };
        self.lock().insert(id, entry);
        info!(result_id = %id, filename, "Stored result");
        id
    }

    /// Fetch a result; expired entries are removed and reported absent.
    pub fn get(&self, id: &ResultId) -> Option<StoredResult> {
        self.get_at(id, Utc::now())
    }

    pub fn get_at(&self, id: &ResultId, now: DateTime<Utc>) -> Option<StoredResult> {
        let mut entries = self.lock();
        if entries.get(id)?.is_expired_at(now) {
            entries.remove(id);
            info!(result_id = %id, "Result expired and was removed");
            return None;
        }
        entries.get(id).cloned()
    }

    /// Remove a result. Returns whether it existed.
    pub fn delete(&self, id: &ResultId) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            info!(result_id = %id, "Deleted result");
        }
        removed
    }

    /// Drop every expired entry and return how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            info!(removed, "Cleaned up expired results");
        }
        removed
    }

    pub fn stats(&self) -> StoreStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> StoreStats {
        let entries = self.lock();
        let total = entries.len();
        let expired = entries.values().filter(|e| e.is_expired_at(now)).count();
        StoreStats {
            total,
            active: total - expired,
            expired,
            expiration_hours: self.expiration_hours,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResultId, StoredResult>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use omrscan_core::{Answer, ImageDimensions, ProcessingMetadata};
    use std::collections::BTreeMap;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn sample_result() -> ProcessingResult {
        let mut responses = BTreeMap::new();
        responses.insert(1, Answer::Marked('A'));
        responses.insert(2, Answer::NoResponse);
        let mut confidence_scores = BTreeMap::new();
        confidence_scores.insert(1, 0.8);
        confidence_scores.insert(2, 0.0);
        ProcessingResult {
            responses,
            metadata: ProcessingMetadata {
                processing_time_seconds: 0.25,
                image_dimensions: ImageDimensions {
                    width: 800,
                    height: 1000,
                },
                bubbles_found: 8,
                bubbles_expected: 8,
                questions_processed: 2,
                confidence_scores,
                min_pixel_threshold_used: 500,
            },
        }
    }

    #[test]
    fn stored_result_can_be_fetched_until_expiry() {
        let store = ResultStore::new(24);
        let id = store.store_at("sheet.png", sample_result(), t0());

        let fetched = store.get_at(&id, t0() + TimeDelta::hours(23)).unwrap();
        assert_eq!(fetched.filename, "sheet.png");
        assert_eq!(fetched.result, sample_result());
        assert_eq!(fetched.expires_at, t0() + TimeDelta::hours(24));

        assert!(store.get_at(&id, t0() + TimeDelta::hours(25)).is_none());
        assert!(store.is_empty(), "expired entry should be removed on lookup");
    }

    #[test]
    fn delete_reports_existence() {
        let store = ResultStore::default();
        let id = store.store("a.jpg", sample_result());
        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn cleanup_and_stats() {
        let store = ResultStore::new(1);
        store.store_at("old.png", sample_result(), t0());
        store.store_at("new.png", sample_result(), t0() + TimeDelta::minutes(90));

        let now = t0() + TimeDelta::minutes(100);
        let stats = store.stats_at(now);
        assert_eq!(
            stats,
            StoreStats {
                total: 2,
                active: 1,
                expired: 1,
                expiration_hours: 1
            }
        );
        assert_eq!(store.cleanup_expired_at(now), 1);
        assert_eq!(store.cleanup_expired_at(now), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ids_are_unique_and_parse_back() {
        let store = ResultStore::default();
        let a = store.store("a.png", sample_result());
        let b = store.store("b.png", sample_result());
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<ResultId>().unwrap(), a);
        assert!(matches!("not-a-uuid".parse::<ResultId>(), Err(OmrError::Validation(_))));
    }

    #[test]
    fn stored_result_serialises() {
        let store = ResultStore::default();
        let id = store.store_at("x.bmp", sample_result(), t0());
        let entry = store.get_at(&id, t0()).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["filename"], "x.bmp");
        assert_eq!(json["result"]["responses"]["1"], "A");
    }
}
