//! Heuristic fraud detection over a rolling 10-minute activity window per
//! client. Three independent signals, any one of which flags the request.
//! The signal that fired goes to server logs only; clients get a generic
//! rejection so the thresholds stay opaque.

use dashmap::DashMap;
use plangate_core::UsageEvent;
use std::collections::HashSet;
use std::fmt;

pub const WINDOW_MS: i64 = 10 * 60 * 1_000;

const MAX_DISTINCT_PLANS: usize = 3;
const MAX_FREE_BATCH_REQUESTS: usize = 5;
const FLOOD_WINDOW_MS: i64 = 60_000;
const MAX_FLOOD_REQUESTS: usize = 30;

/// One remembered request within the fraud window.
#[derive(Debug, Clone)]
pub struct Activity {
    pub timestamp_ms: i64,
    pub plan_type: String,
    pub action_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudSignal {
    PlanHopping { distinct_plans: usize },
    FreeBatchAbuse { batch_requests: usize },
    RequestFlooding { recent_requests: usize },
}

impl fmt::Display for FraudSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FraudSignal::PlanHopping { distinct_plans } => {
                write!(f, "plan hopping ({distinct_plans} distinct plans)")
            }
            FraudSignal::FreeBatchAbuse { batch_requests } => {
                write!(f, "free-tier batch abuse ({batch_requests} batch requests)")
            }
            FraudSignal::RequestFlooding { recent_requests } => {
                write!(f, "request flooding ({recent_requests} requests in 60s)")
            }
        }
    }
}

pub struct FraudDetector {
    windows: DashMap<String, Vec<Activity>>,
}

impl Default for FraudDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FraudDetector {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Record the event and evaluate all heuristics against the updated
    /// window (current event included). Append, prune, and evaluation
    /// happen under the client's shard lock in one synchronous step.
    pub fn observe(&self, event: &UsageEvent) -> Option<FraudSignal> {
        let now_ms = event.timestamp.timestamp_millis();
        let mut window = self.windows.entry(event.client_id.clone()).or_default();
        window.retain(|a| now_ms - a.timestamp_ms < WINDOW_MS);
        window.push(Activity {
            timestamp_ms: now_ms,
            plan_type: event.plan_type.clone(),
            action_type: event.action_type.clone(),
        });
        evaluate(window.as_slice(), &event.plan_type, now_ms)
    }

    /// Snapshot of a client's current window, for audit logging when a
    /// signal fires.
    pub fn snapshot(&self, client_id: &str) -> Vec<Activity> {
        self.windows
            .get(client_id)
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

fn evaluate(window: &[Activity], plan_type: &str, now_ms: i64) -> Option<FraudSignal> {
    // 1. Plan hopping: too many distinct plan types claimed.
    let distinct_plans: HashSet<&str> = window.iter().map(|a| a.plan_type.as_str()).collect();
    if distinct_plans.len() > MAX_DISTINCT_PLANS {
        return Some(FraudSignal::PlanHopping {
            distinct_plans: distinct_plans.len(),
        });
    }

    // 2. Free-tier batch abuse.
    if plan_type == "free" {
        let batch_requests = window
            .iter()
            .filter(|a| a.action_type.as_deref() == Some("batch"))
            .count();
        if batch_requests > MAX_FREE_BATCH_REQUESTS {
            return Some(FraudSignal::FreeBatchAbuse { batch_requests });
        }
    }

    // 3. Flooding within the trailing minute sub-window.
    let recent_requests = window
        .iter()
        .filter(|a| now_ms - a.timestamp_ms < FLOOD_WINDOW_MS)
        .count();
    if recent_requests > MAX_FLOOD_REQUESTS {
        return Some(FraudSignal::RequestFlooding { recent_requests });
    }

    None
}
