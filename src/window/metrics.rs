//! Engine counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters for the window. Written with relaxed atomics from the
/// writer and the admission path, read by health checks.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    accepted: AtomicU64,
    expired: AtomicU64,
    rejected_future: AtomicU64,
    rejected_old: AtomicU64,
    rejected_range: AtomicU64,
}

/// Point-in-time copy of `EngineMetrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub accepted: u64,
    pub expired: u64,
    pub rejected_future: u64,
    pub rejected_old: u64,
    pub rejected_range: u64,
}

impl MetricsSnapshot {
    /// Events accepted but not yet expired.
    pub fn active(&self) -> u64 {
        self.accepted.saturating_sub(self.expired)
    }
}

impl EngineMetrics {
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_future(&self) {
        self.rejected_future.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_old(&self) {
        self.rejected_old.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_range(&self) {
        self.rejected_range.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            rejected_future: self.rejected_future.load(Ordering::Relaxed),
            rejected_old: self.rejected_old.load(Ordering::Relaxed),
            rejected_range: self.rejected_range.load(Ordering::Relaxed),
        }
    }
}
