//! Background refresh of the permission cache
//!
//! Pulls a full snapshot from the store on a timer and installs it. Failures
//! are logged and absorbed: the last good snapshot keeps serving reads while
//! the loop backs off.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cache::PermissionCache;
use super::metrics::MetricsCollector;
use crate::error::{AuthzError, Result};
use crate::store::PermissionStore;

/// Refresh loop timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Delay between successful refreshes; bounds staleness
    pub interval: Duration,

    /// Upper bound on a single snapshot fetch
    pub fetch_timeout: Duration,

    /// Cap on the delay after repeated failures
    pub max_backoff: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            fetch_timeout: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(30_000),
        }
    }
}

impl RefreshConfig {
    /// Delay before the next attempt after `failures` consecutive failures
    ///
    /// `min(interval * 2^failures, max_backoff)`
    pub fn delay_after(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.min(16);
        self.interval
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Fetches snapshots from a store and installs them into a cache
///
/// Clones share one refresh lock, so an on-demand refresh and the background
/// loop never interleave their fetch and install.
#[derive(Clone)]
pub struct Refresher {
    store: Arc<dyn PermissionStore>,
    cache: Arc<PermissionCache>,
    metrics: Arc<MetricsCollector>,
    config: RefreshConfig,
    refresh_lock: Arc<Mutex<()>>,
}

impl Refresher {
    pub fn new(
        store: Arc<dyn PermissionStore>,
        cache: Arc<PermissionCache>,
        metrics: Arc<MetricsCollector>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            store,
            cache,
            metrics,
            config,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Fetch one snapshot and install it
    ///
    /// Every fetched snapshot is installed, including one whose version is
    /// lower than the cached one. Returns whether the installed version
    /// changed. A fetch that exceeds `fetch_timeout` fails with
    /// `StoreUnavailable`.
    pub async fn refresh_once(&self) -> Result<bool> {
        // Held across fetch and install; the snapshot fetched last is the
        // one installed last
        let _guard = self.refresh_lock.lock().await;

        let fetched = tokio::time::timeout(self.config.fetch_timeout, self.store.snapshot()).await;

        let snapshot = match fetched {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                self.metrics.record_refresh_failure();
                return Err(e);
            }
            Err(_) => {
                self.metrics.record_refresh_failure();
                return Err(AuthzError::StoreUnavailable(format!(
                    "snapshot fetch timed out after {:?}",
                    self.config.fetch_timeout
                )));
            }
        };

        let version = snapshot.version;
        let installed = self.cache.install(snapshot);
        self.metrics.record_refresh_success(self.cache.version());

        if !installed {
            debug!(version, "Permission snapshot version unchanged");
        }

        Ok(installed)
    }

    /// Run until `shutdown` is cancelled
    ///
    /// Refreshes immediately, then every `interval`; after a failure waits
    /// `delay_after(failures)` instead.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            fetch_timeout_ms = self.config.fetch_timeout.as_millis() as u64,
            "Permission cache refresher started"
        );

        let mut failures: u32 = 0;

        loop {
            let result = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.refresh_once() => result,
            };

            match result {
                Ok(_) => {
                    if failures > 0 {
                        info!(failures, "Permission store reachable again");
                    }
                    failures = 0;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    warn!(
                        failures,
                        serving_version = self.cache.version(),
                        "Permission cache refresh failed: {}",
                        e
                    );
                }
            }

            let delay = if failures == 0 {
                self.config.interval
            } else {
                self.config.delay_after(failures)
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Permission cache refresher stopped");
    }

    /// Spawn the loop onto the current runtime
    pub fn spawn(self) -> RefreshHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(self.run(token.clone()));
        RefreshHandle { token, task }
    }
}

/// Handle to a running refresh loop
pub struct RefreshHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Whether the loop is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Token that stops the loop when cancelled
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the loop and wait for it to exit
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            warn!("Refresh task ended abnormally: {}", e);
        }
    }
}
