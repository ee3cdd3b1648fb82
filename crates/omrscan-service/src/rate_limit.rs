// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-client sliding-window rate limiting.
//
// Every request is recorded, allowed or not, so a client that keeps
// hammering the service stays over the limit until it backs off.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use omrscan_core::ServiceConfig;
use omrscan_core::error::{OmrError, Result};
use serde::Serialize;
use tracing::warn;

/// Key used when no client address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Outcome of one rate-limit check, with the counts that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    pub minute_count: usize,
    pub minute_limit: usize,
    pub hour_count: usize,
    pub hour_limit: usize,
}

impl RateDecision {
    /// `Ok(self)` when allowed, `OmrError::RateLimited` otherwise.
    pub fn into_result(self) -> Result<Self> {
        if self.allowed {
            Ok(self)
        } else {
            Err(OmrError::RateLimited {
                minute_count: self.minute_count,
                hour_count: self.hour_count,
            })
        }
    }
}

/// Request timestamps of one client, oldest first.
#[derive(Debug, Default)]
struct ClientWindow {
    minute: VecDeque<DateTime<Utc>>,
    hour: VecDeque<DateTime<Utc>>,
}

impl ClientWindow {
    fn prune(&mut self, now: DateTime<Utc>) {
        prune_older_than(&mut self.minute, now, TimeDelta::minutes(1));
        prune_older_than(&mut self.hour, now, TimeDelta::hours(1));
    }

    fn is_empty(&self) -> bool {
        self.minute.is_empty() && self.hour.is_empty()
    }
}

/// Drop entries at least `window` old.
fn prune_older_than(entries: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: TimeDelta) {
    while entries.front().is_some_and(|&t| now - t >= window) {
        entries.pop_front();
    }
}

/// Sliding-window limiter keyed by client address.
pub struct RateLimiter {
    requests_per_minute: usize,
    requests_per_hour: usize,
    clients: Mutex<HashMap<String, ClientWindow>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

impl RateLimiter {
    pub fn new(requests_per_minute: usize, requests_per_hour: usize) -> Self {
        Self {
            requests_per_minute,
            requests_per_hour,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.requests_per_minute, config.requests_per_hour)
    }

    /// Record a request from `client` at `now` and decide whether it may proceed.
    pub fn check(&self, client: &str, now: DateTime<Utc>) -> RateDecision {
        let mut clients = self.lock();
        let window = clients.entry(client.to_string()).or_default();
        window.prune(now);
        window.minute.push_back(now);
        window.hour.push_back(now);

        let decision = self.decide(window);
        if !decision.allowed {
            warn!(
                client,
                minute_count = decision.minute_count,
                hour_count = decision.hour_count,
                "Rate limit exceeded"
            );
        }
        decision
    }

    /// `check` at the current time.
    pub fn check_now(&self, client: &str) -> RateDecision {
        self.check(client, Utc::now())
    }

    /// Current counts for `client` without recording a request.
    pub fn usage(&self, client: &str, now: DateTime<Utc>) -> RateDecision {
        let mut clients = self.lock();
        match clients.get_mut(client) {
            Some(window) => {
                window.prune(now);
                self.decide(window)
            }
            None => self.decide(&ClientWindow::default()),
        }
    }

    /// Forget clients with no requests in the last hour. Returns how many were dropped.
    pub fn purge_idle(&self, now: DateTime<Utc>) -> usize {
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, window| {
            window.prune(now);
            !window.is_empty()
        });
        before - clients.len()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientWindow>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decide(&self, window: &ClientWindow) -> RateDecision {
        let minute_count = window.minute.len();
        let hour_count = window.hour.len();
        RateDecision {
            allowed: minute_count <= self.requests_per_minute
                && hour_count <= self.requests_per_hour,
            minute_count,
            minute_limit: self.requests_per_minute,
            hour_count,
            hour_limit: self.requests_per_hour,
        }
    }
}

/// Pick the key that identifies a client behind optional proxy headers.
///
/// Uses the first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer
/// address, then `"unknown"`. Blank values are skipped.
pub fn client_key(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<&str>,
) -> String {
    let first_forwarded = forwarded_for.and_then(|v| v.split(',').next()).map(str::trim);
    [first_forwarded, real_ip.map(str::trim), peer.map(str::trim)]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn minute_limit_applies_after_n_requests() {
        let limiter = RateLimiter::new(3, 100);
        for i in 0..3 {
            let d = limiter.check("10.0.0.1", t0() + TimeDelta::seconds(i));
            assert!(d.allowed);
            assert_eq!(d.minute_count, i as usize + 1);
        }
        let d = limiter.check("10.0.0.1", t0() + TimeDelta::seconds(3));
        assert!(!d.allowed);
        assert_eq!(d.minute_count, 4);
        assert_eq!(d.minute_limit, 3);
        assert!(matches!(
            d.into_result(),
            Err(OmrError::RateLimited {
                minute_count: 4,
                ..
            })
        ));
    }

    #[test]
    fn minute_window_slides() {
        let limiter = RateLimiter::new(2, 100);
        limiter.check("c", t0());
        limiter.check("c", t0() + TimeDelta::seconds(10));
        assert!(!limiter.check("c", t0() + TimeDelta::seconds(20)).allowed);

        // 60 s after the first request it has left the minute window.
        let d = limiter.check("c", t0() + TimeDelta::seconds(75));
        assert_eq!(d.minute_count, 2);
        assert!(d.allowed);
        assert_eq!(d.hour_count, 4);
    }

    #[test]
    fn hour_limit_is_independent() {
        let limiter = RateLimiter::new(100, 3);
        for i in 0..3 {
            assert!(limiter.check("c", t0() + TimeDelta::minutes(i * 5)).allowed);
        }
        let d = limiter.check("c", t0() + TimeDelta::minutes(20));
        assert!(!d.allowed);
        assert_eq!(d.minute_count, 1);
        assert_eq!(d.hour_count, 4);

        let later = limiter.check("c", t0() + TimeDelta::minutes(90));
        assert!(later.allowed);
        assert_eq!(later.hour_count, 1);
    }

    #[test]
    fn clients_are_tracked_separately() {
        let limiter = RateLimiter::new(1, 10);
        assert!(limiter.check("a", t0()).allowed);
        assert!(limiter.check("b", t0()).allowed);
        assert!(!limiter.check("a", t0()).allowed);
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn usage_does_not_record() {
        let limiter = RateLimiter::default();
        limiter.check("a", t0());
        let u = limiter.usage("a", t0());
        assert_eq!(u.minute_count, 1);
        assert_eq!(limiter.usage("a", t0()).minute_count, 1);
        assert_eq!(limiter.usage("nobody", t0()).hour_count, 0);
        assert_eq!((u.minute_limit, u.hour_limit), (60, 1000));
    }

    #[test]
    fn idle_clients_are_purged() {
        let limiter = RateLimiter::default();
        limiter.check("old", t0());
        limiter.check("recent", t0() + TimeDelta::minutes(50));
        assert_eq!(limiter.purge_idle(t0() + TimeDelta::minutes(70)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let limiter = Arc::new(RateLimiter::default());
        limiter.check("a", t0());
        let holder = Arc::clone(&limiter);
        let joined = std::thread::spawn(move || {
            let _guard = holder.clients.lock().unwrap();
            panic!("worker died holding the client map");
        })
        .join();
        assert!(joined.is_err());
        assert!(limiter.clients.is_poisoned());

        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.check("b", t0()).allowed);
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn client_key_prefers_forwarded_header() {
        assert_eq!(
            client_key(Some(" 203.0.113.7 , 10.0.0.1"), Some("10.0.0.2"), Some("127.0.0.1")),
            "203.0.113.7"
        );
        assert_eq!(client_key(None, Some("10.0.0.2"), Some("127.0.0.1")), "10.0.0.2");
        assert_eq!(client_key(Some(""), None, Some("127.0.0.1")), "127.0.0.1");
        assert_eq!(client_key(None, None, None), "unknown");
    }
}
