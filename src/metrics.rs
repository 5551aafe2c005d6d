use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing analysis traffic.
#[derive(Default)]
pub struct AnalysisMetrics {
    requests_received: AtomicU64,
    analyses_completed: AtomicU64,
    requests_rejected: AtomicU64,
    analyses_failed: AtomicU64,
}

impl AnalysisMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inbound analysis request before validation.
    pub fn record_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that produced a full analysis.
    pub fn record_completed(&self) {
        self.analyses_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request turned away by upload validation.
    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that failed during persistence, extraction, or analysis.
    pub fn record_failed(&self) {
        self.analyses_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            analyses_completed: self.analyses_completed.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            analyses_failed: self.analyses_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the analysis counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of `POST /analyze` requests seen since startup.
    pub requests_received: u64,
    /// Requests that returned a successful analysis.
    pub analyses_completed: u64,
    /// Requests rejected with a client error before any work was done.
    pub requests_rejected: u64,
    /// Requests that failed after validation.
    pub analyses_failed: u64,
}
