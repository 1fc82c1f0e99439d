//! Per-client sliding-window rate limiting.
//!
//! One timestamp list per client id, pruned lazily on every check. Entries
//! never outlive the window after a read, and a denied check consumes
//! nothing: the window only grows on allowed requests.

use dashmap::DashMap;

pub const MAX_REQUESTS_PER_WINDOW: usize = 60;
pub const WINDOW_MS: i64 = 60_000;

pub struct RateLimiter {
    // Keyed by client id; DashMap gives us sharded per-key locking so one
    // client's burst never serializes unrelated traffic.
    windows: DashMap<String, Vec<i64>>,
    max_requests: usize,
    window_ms: i64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_settings(MAX_REQUESTS_PER_WINDOW, WINDOW_MS)
    }

    pub fn with_settings(max_requests: usize, window_ms: i64) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window_ms,
        }
    }

    /// Prune, test, and (if allowed) record in one atomic step for the
    /// client. The append is the final action of an allowed decision, so a
    /// request abandoned mid-flight never leaves a half-updated window.
    pub fn check_and_record(&self, client_id: &str, now_ms: i64) -> bool {
        let mut window = self.windows.entry(client_id.to_string()).or_default();
        window.retain(|&t| now_ms - t < self.window_ms);
        if window.len() >= self.max_requests {
            return false;
        }
        window.push(now_ms);
        true
    }

    /// Current in-window request count for a client, pruning as it reads.
    pub fn in_window(&self, client_id: &str, now_ms: i64) -> usize {
        match self.windows.get_mut(client_id) {
            Some(mut window) => {
                window.retain(|&t| now_ms - t < self.window_ms);
                window.len()
            }
            None => 0,
        }
    }
}
