//! Shared fixtures for integration tests

#![allow(dead_code)]

use cretoai_rbac::{
    AuthorizationEngine, EngineConfig, Grant, InMemoryPermissionStore, Mutation, Permission,
    PermissionStore, RefreshConfig, Resource, Role, RoleMembership,
};
use std::sync::Arc;
use std::time::Duration;

/// Refresh interval used by tests that exercise the background loop
pub const FAST_INTERVAL: Duration = Duration::from_millis(25);

/// Comfortably more than one refresh interval
pub const SETTLE: Duration = Duration::from_millis(150);

pub fn fast_refresh() -> RefreshConfig {
    RefreshConfig {
        interval: FAST_INTERVAL,
        fetch_timeout: Duration::from_millis(50),
        max_backoff: Duration::from_millis(100),
    }
}

/// Store plus an engine that has already installed the store's snapshot
pub struct Fixture {
    pub store: Arc<InMemoryPermissionStore>,
    pub engine: Arc<AuthorizationEngine>,
}

impl Fixture {
    /// Fixture with the given login roles and a superuser named `admin`
    pub async fn with_roles(names: &[&str]) -> Self {
        Self::with_config(names, EngineConfig::default()).await
    }

    pub async fn with_config(names: &[&str], config: EngineConfig) -> Self {
        let store = Arc::new(InMemoryPermissionStore::new());
        store
            .create_role(Role::login("admin").with_superuser(true))
            .await
            .unwrap();
        for name in names {
            store.create_role(Role::login(*name)).await.unwrap();
        }

        let engine = AuthorizationEngine::start(config, store.clone())
            .await
            .unwrap();

        Self {
            store,
            engine: Arc::new(engine),
        }
    }

    /// Grant directly in the store, bypassing mutation gating
    pub async fn grant(&self, role: &str, permission: Permission, resource: Resource) {
        self.store
            .mutate(Mutation::Grant(Grant::new(role, permission, resource)))
            .await
            .unwrap();
    }

    pub async fn revoke(&self, role: &str, permission: Permission, resource: Resource) {
        self.store
            .mutate(Mutation::Revoke(Grant::new(role, permission, resource)))
            .await
            .unwrap();
    }

    pub async fn add_member(&self, member: &str, granted: &str) {
        self.store
            .mutate(Mutation::GrantRole(RoleMembership::new(member, granted)))
            .await
            .unwrap();
    }

    /// Install the store's current snapshot
    pub async fn sync(&self) {
        self.engine.refresh_now().await.unwrap();
    }

    /// Current definition of `name` as the engine sees it
    pub fn role(&self, name: &str) -> Role {
        self.engine
            .principal(name)
            .unwrap_or_else(|| Role::new(name))
    }

    pub fn allowed(&self, role: &str, permission: Permission, resource: &Resource) -> bool {
        self.engine.authorize(&self.role(role), permission, resource)
    }
}
