//! Per-client sliding-window admission control.
//!
//! Each client address owns a queue of the instants at which its admitted
//! requests arrived. Rejected attempts are never recorded, so only admitted
//! requests occupy the window.
//!
//! Client entries are never evicted: an address that stops sending keeps
//! an (eventually empty) queue for the life of the process.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Aggregate view of the limiter, shown on the listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterStats {
    /// Distinct client addresses seen since startup
    pub clients: usize,
    /// Clients whose live window is at or over the limit
    pub limited: usize,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Seconds a rejected client is told to wait: the window, rounded,
    /// never less than one.
    pub fn retry_after_secs(&self) -> u64 {
        (self.window.as_secs_f64().round() as u64).max(1)
    }

    /// Decides whether `client` may make a request at `now`.
    ///
    /// `now` must not go backwards for a given client; callers pass
    /// `Instant::now()`.
    pub fn admit(&self, client: IpAddr, now: Instant) -> bool {
        let mut windows = self.lock();
        let stamps = windows.entry(client).or_default();

        prune(stamps, now, self.window);

        if stamps.len() >= self.max_requests {
            return false;
        }
        stamps.push_back(now);
        true
    }

    pub fn stats(&self, now: Instant) -> LimiterStats {
        let windows = self.lock();
        let limited = windows
            .values()
            .filter(|stamps| live_count(stamps, now, self.window) >= self.max_requests)
            .count();

        LimiterStats {
            clients: windows.len(),
            limited,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, VecDeque<Instant>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops every stamp at or before `now - window`. Stamps are queued in
/// arrival order, so trimming the front is enough.
fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    let Some(cutoff) = now.checked_sub(window) else {
        return;
    };
    while stamps.front().is_some_and(|t| *t <= cutoff) {
        stamps.pop_front();
    }
}

fn live_count(stamps: &VecDeque<Instant>, now: Instant, window: Duration) -> usize {
    match now.checked_sub(window) {
        Some(cutoff) => stamps.iter().filter(|t| **t > cutoff).count(),
        None => stamps.len(),
    }
}
