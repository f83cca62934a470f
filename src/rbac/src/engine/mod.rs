//! Authorization engine
//!
//! Composes the resource hierarchy, the role graph and the snapshot cache to
//! answer permission checks, and gates GRANT/REVOKE mutations before they
//! reach the store.
//!
//! # Architecture
//!
//! ```text
//! authorize(principal, permission, resource)
//!     │
//!     ├─ superuser? ──────────────────────────────► ALLOW
//!     │
//!     ├─ RoleGraph::effective_roles(principal)
//!     ├─ scopes_for(permission, resource)
//!     └─ CacheState::check(role, permission, scope) for each pair
//!                        ▲
//!        Refresher ──────┘ (timer, full snapshot from PermissionStore)
//! ```

pub mod cache;
pub mod decision;
pub mod metrics;
pub mod refresh;

pub use cache::{CacheState, PermissionCache};
pub use decision::Decision;
pub use metrics::{EngineMetrics, MetricsCollector};
pub use refresh::{RefreshConfig, RefreshHandle, Refresher};

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AuthzError, Result};
use crate::scope::Resource;
use crate::statement::{scopes_for, Statement};
use crate::store::{Mutation, PermissionStore};
use crate::types::{Permission, Role};

/// Authorization engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Refresh loop timing
    pub refresh: RefreshConfig,
}

/// Role-based authorization engine
///
/// `authorize` is synchronous and touches only the in-memory cache; it never
/// waits on the store. Mutations are serialized through a single async lock.
pub struct AuthorizationEngine {
    store: Arc<dyn PermissionStore>,
    cache: Arc<PermissionCache>,
    metrics: Arc<MetricsCollector>,
    refresher: Refresher,
    mutation_lock: Mutex<()>,
}

impl AuthorizationEngine {
    /// Create an engine over `store`
    ///
    /// The cache starts empty; call [`refresh_now`](Self::refresh_now) or
    /// [`spawn_refresh`](Self::spawn_refresh) to populate it.
    pub fn new(config: EngineConfig, store: Arc<dyn PermissionStore>) -> Self {
        let cache = Arc::new(PermissionCache::new());
        let metrics = Arc::new(MetricsCollector::new());
        let refresher = Refresher::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::clone(&metrics),
            config.refresh,
        );

        info!(
            refresh_interval_ms = config.refresh.interval.as_millis() as u64,
            "AuthorizationEngine initialized"
        );

        Self {
            store,
            cache,
            metrics,
            refresher,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Create an engine and install the store's current snapshot
    pub async fn start(config: EngineConfig, store: Arc<dyn PermissionStore>) -> Result<Self> {
        let engine = Self::new(config, store);
        engine.refresh_now().await?;
        Ok(engine)
    }

    /// Whether `principal` may perform `permission` on `resource`
    pub fn authorize(&self, principal: &Role, permission: Permission, resource: &Resource) -> bool {
        self.explain(principal, permission, resource).is_allowed()
    }

    /// Same answer as [`authorize`](Self::authorize), with the grant that
    /// satisfied it
    ///
    /// `Permission::All` is satisfied only if every individual permission is.
    pub fn explain(&self, principal: &Role, permission: Permission, resource: &Resource) -> Decision {
        if principal.is_superuser {
            self.metrics.record_decision(true, true);
            debug!(role = %principal.name, %permission, %resource, "Superuser bypass");
            return Decision::Superuser;
        }

        let state = self.cache.load();
        let decision = if permission.is_all() {
            Self::evaluate_all(&state, &principal.name, resource)
        } else {
            Self::evaluate(&state, &principal.name, permission, resource)
        };

        self.metrics.record_decision(decision.is_allowed(), false);
        debug!(
            role = %principal.name,
            %permission,
            %resource,
            version = state.version(),
            "{}",
            decision
        );

        decision
    }

    fn evaluate(
        state: &CacheState,
        principal: &str,
        permission: Permission,
        resource: &Resource,
    ) -> Decision {
        let chain = scopes_for(permission, resource);

        for role in state.effective_roles(principal) {
            for scope in &chain {
                if state.check(role, permission, scope) {
                    return Decision::Granted {
                        role: role.to_string(),
                        permission,
                        scope: scope.clone(),
                    };
                }
            }
        }

        Decision::Denied
    }

    fn evaluate_all(state: &CacheState, principal: &str, resource: &Resource) -> Decision {
        let mut first = None;

        for &permission in Permission::expand(Permission::All) {
            match Self::evaluate(state, principal, permission, resource) {
                Decision::Granted { role, scope, .. } => {
                    first.get_or_insert((role, scope));
                }
                _ => return Decision::Denied,
            }
        }

        match first {
            Some((role, scope)) => Decision::Granted {
                role,
                permission: Permission::All,
                scope,
            },
            None => Decision::Denied,
        }
    }

    fn require(&self, caller: &Role, permission: Permission, resource: &Resource) -> Result<()> {
        if self.authorize(caller, permission, resource) {
            Ok(())
        } else {
            Err(AuthzError::unauthorized(
                caller.name.clone(),
                permission,
                resource.clone(),
            ))
        }
    }

    /// Check that `caller` may issue `op`
    ///
    /// Permission grants need AUTHORIZE on the target resource (or an
    /// ancestor); role grants need AUTHORIZE on both the granted and the
    /// recipient role.
    pub fn authorize_mutation(&self, caller: &Role, op: &Mutation) -> Result<()> {
        match op {
            Mutation::Grant(grant) | Mutation::Revoke(grant) => {
                self.require(caller, Permission::Authorize, &grant.resource)
            }
            Mutation::GrantRole(edge) | Mutation::RevokeRole(edge) => {
                self.require(caller, Permission::Authorize, &Resource::role(&edge.granted))?;
                self.require(caller, Permission::Authorize, &Resource::role(&edge.member))
            }
        }
    }

    /// Authorize `op`, then forward it to the store
    ///
    /// A GRANT ROLE that would close a membership cycle in the installed
    /// graph fails with `Cycle` without reaching the store. The change is not
    /// visible to `authorize` until the next refresh.
    pub async fn apply_mutation(&self, caller: &Role, op: Mutation) -> Result<()> {
        self.authorize_mutation(caller, &op)?;

        let _guard = self.mutation_lock.lock().await;

        if let Mutation::GrantRole(edge) = &op {
            self.cache
                .load()
                .graph()
                .check_edge(&edge.member, &edge.granted)?;
        }

        info!(caller = %caller.name, mutation = %op, "Applying permission mutation");
        self.store.mutate(op).await
    }

    /// Check every obligation of `statement`, failing on the first denial
    pub fn authorize_statement(&self, caller: &Role, statement: &Statement) -> Result<()> {
        for obligation in statement.obligations() {
            self.require(caller, obligation.permission, &obligation.resource)?;
        }
        Ok(())
    }

    /// Current definition of role `name` from the installed snapshot
    pub fn principal(&self, name: &str) -> Option<Role> {
        self.cache.load().role(name).cloned()
    }

    /// Fetch and install a snapshot now
    pub async fn refresh_now(&self) -> Result<bool> {
        self.refresher.refresh_once().await
    }

    /// Start the background refresh loop
    pub fn spawn_refresh(&self) -> RefreshHandle {
        self.refresher.clone().spawn()
    }

    /// Version of the snapshot serving reads
    pub fn snapshot_version(&self) -> u64 {
        self.cache.version()
    }

    /// Get engine metrics
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.get_metrics()
    }

    /// Export engine metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        self.metrics.export_prometheus()
    }

    /// The snapshot cache
    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// The backing store
    pub fn store(&self) -> Arc<dyn PermissionStore> {
        Arc::clone(&self.store)
    }
}
