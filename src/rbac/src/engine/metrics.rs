//! Metrics collection for authorization engine observability

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of engine counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineMetrics {
    /// Total number of authorize calls
    pub total_requests: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Number of denied decisions
    pub denied_decisions: u64,

    /// Decisions short-circuited by the superuser flag
    pub superuser_bypasses: u64,

    /// Snapshots fetched and installed (or already current)
    pub refresh_successes: u64,

    /// Snapshot fetches that failed or timed out
    pub refresh_failures: u64,

    /// Version of the snapshot currently serving reads
    pub installed_version: u64,
}

impl EngineMetrics {
    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed_decisions + self.denied_decisions;
        if total == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / total as f64
        }
    }
}

/// Lock-free metrics collector
///
/// `authorize` is synchronous and hot, so every counter is a relaxed atomic.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total_requests: AtomicU64,
    allowed_decisions: AtomicU64,
    denied_decisions: AtomicU64,
    superuser_bypasses: AtomicU64,
    refresh_successes: AtomicU64,
    refresh_failures: AtomicU64,
    installed_version: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authorization decision
    pub fn record_decision(&self, allowed: bool, superuser: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if allowed {
            self.allowed_decisions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied_decisions.fetch_add(1, Ordering::Relaxed);
        }

        if superuser {
            self.superuser_bypasses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful refresh serving `version`
    pub fn record_refresh_success(&self, version: u64) {
        self.refresh_successes.fetch_add(1, Ordering::Relaxed);
        self.installed_version.store(version, Ordering::Relaxed);
    }

    /// Record a failed refresh
    pub fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn get_metrics(&self) -> EngineMetrics {
        EngineMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            allowed_decisions: self.allowed_decisions.load(Ordering::Relaxed),
            denied_decisions: self.denied_decisions.load(Ordering::Relaxed),
            superuser_bypasses: self.superuser_bypasses.load(Ordering::Relaxed),
            refresh_successes: self.refresh_successes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            installed_version: self.installed_version.load(Ordering::Relaxed),
        }
    }

    /// Reset decision and refresh counters; the installed version is kept
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.allowed_decisions.store(0, Ordering::Relaxed);
        self.denied_decisions.store(0, Ordering::Relaxed);
        self.superuser_bypasses.store(0, Ordering::Relaxed);
        self.refresh_successes.store(0, Ordering::Relaxed);
        self.refresh_failures.store(0, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics();

        format!(
            r#"# HELP rbac_authorize_total Total number of authorization checks
# TYPE rbac_authorize_total counter
rbac_authorize_total {}

# HELP rbac_allowed_total Number of allowed decisions
# TYPE rbac_allowed_total counter
rbac_allowed_total {}

# HELP rbac_denied_total Number of denied decisions
# TYPE rbac_denied_total counter
rbac_denied_total {}

# HELP rbac_superuser_bypass_total Decisions allowed by the superuser flag
# TYPE rbac_superuser_bypass_total counter
rbac_superuser_bypass_total {}

# HELP rbac_refresh_success_total Successful permission cache refreshes
# TYPE rbac_refresh_success_total counter
rbac_refresh_success_total {}

# HELP rbac_refresh_failure_total Failed permission cache refreshes
# TYPE rbac_refresh_failure_total counter
rbac_refresh_failure_total {}

# HELP rbac_snapshot_version Version of the installed permission snapshot
# TYPE rbac_snapshot_version gauge
rbac_snapshot_version {}
"#,
            metrics.total_requests,
            metrics.allowed_decisions,
            metrics.denied_decisions,
            metrics.superuser_bypasses,
            metrics.refresh_successes,
            metrics.refresh_failures,
            metrics.installed_version,
        )
    }
}
