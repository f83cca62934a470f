//! In-memory permission store
//!
//! Stand-in for the catalog store in tests, benches and the CLI. Applies the
//! same acceptance rules the catalog does (unknown roles rejected, membership
//! cycles rejected) and can simulate an unreachable or slow store.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Mutation, PermissionStore, Snapshot};
use crate::error::{AuthzError, Result};
use crate::roles::RoleGraph;
use crate::scope::Resource;
use crate::types::{Grant, Permission, Role, RoleMembership, RoleName};

/// Initial store contents, loadable from TOML
///
/// ```toml
/// [[roles]]
/// name = "admin"
/// is_superuser = true
/// can_login = true
///
/// [[grants]]
/// role = "analyst"
/// permission = "SELECT"
/// resource = "data/shop"
///
/// [[memberships]]
/// member = "alice"
/// granted = "analyst"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub grants: Vec<Grant>,
    #[serde(default)]
    pub memberships: Vec<RoleMembership>,
}

impl Seed {
    /// Parse a seed from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| AuthzError::Config(format!("Failed to parse seed: {}", e)))
    }

    /// Load a seed from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    roles: HashMap<RoleName, Role>,
    grants: HashSet<Grant>,
    role_edges: HashSet<RoleMembership>,
    version: u64,
}

impl StoreState {
    fn require_role(&self, name: &str) -> Result<()> {
        if self.roles.contains_key(name) {
            Ok(())
        } else {
            Err(AuthzError::StoreMutation(format!("Role {} does not exist", name)))
        }
    }

    fn require_resource(&self, resource: &Resource) -> Result<()> {
        resource.validate()?;
        match resource {
            Resource::Role(name) => self.require_role(name),
            _ => Ok(()),
        }
    }

    /// Apply a mutation, returning whether state changed
    fn apply(&mut self, op: Mutation) -> Result<bool> {
        match op {
            Mutation::Grant(grant) => {
                self.require_role(&grant.role)?;
                self.require_resource(&grant.resource)?;
                Ok(self.grants.insert(grant))
            }
            Mutation::Revoke(grant) => {
                self.require_role(&grant.role)?;
                Ok(self.revoke(grant))
            }
            Mutation::GrantRole(edge) => {
                self.require_role(&edge.member)?;
                self.require_role(&edge.granted)?;
                if self.role_edges.contains(&edge) {
                    return Ok(false);
                }

                let (graph, _) = RoleGraph::from_edges(&self.role_edges);
                graph
                    .check_edge(&edge.member, &edge.granted)
                    .map_err(|e| AuthzError::StoreMutation(e.to_string()))?;

                Ok(self.role_edges.insert(edge))
            }
            Mutation::RevokeRole(edge) => {
                self.require_role(&edge.member)?;
                self.require_role(&edge.granted)?;
                Ok(self.role_edges.remove(&edge))
            }
        }
    }

    fn revoke(&mut self, grant: Grant) -> bool {
        let Grant { role, permission, resource } = grant;

        if permission.is_all() {
            let before = self.grants.len();
            self.grants
                .retain(|g| !(g.role == role && g.resource == resource));
            return self.grants.len() != before;
        }

        let mut changed = self
            .grants
            .remove(&Grant::new(role.clone(), permission, resource.clone()));

        // Revoking one permission out of a held ALL keeps the rest of what
        // ALL means on this kind of resource
        let all = Grant::new(role.clone(), Permission::All, resource.clone());
        if self.grants.remove(&all) {
            for &p in Permission::applicable_to(resource.kind()) {
                if p != permission {
                    self.grants
                        .insert(Grant::new(role.clone(), p, resource.clone()));
                }
            }
            changed = true;
        }

        changed
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

/// In-memory permission store implementation
pub struct InMemoryPermissionStore {
    state: Arc<RwLock<StoreState>>,

    /// When false, `snapshot()` fails with `StoreUnavailable`
    available: AtomicBool,

    /// Artificial latency added to `snapshot()`, in milliseconds
    snapshot_delay_ms: AtomicU64,
}

impl InMemoryPermissionStore {
    /// Create an empty store at version 1
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                version: 1,
                ..Default::default()
            })),
            available: AtomicBool::new(true),
            snapshot_delay_ms: AtomicU64::new(0),
        }
    }

    /// Create a store populated from a seed
    ///
    /// Roles are created first, then memberships, then grants, each through
    /// the regular acceptance rules.
    pub async fn from_seed(seed: Seed) -> Result<Self> {
        let store = Self::new();

        for role in seed.roles {
            store.create_role(role).await?;
        }
        for edge in seed.memberships {
            store.mutate(Mutation::GrantRole(edge)).await?;
        }
        for grant in seed.grants {
            store.mutate(Mutation::Grant(grant)).await?;
        }

        Ok(store)
    }

    /// Current store version
    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    /// Simulate the store becoming unreachable (or reachable again)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Add artificial latency to snapshot reads
    pub fn set_snapshot_delay(&self, delay: Duration) {
        self.snapshot_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// CREATE ROLE
    pub async fn create_role(&self, role: Role) -> Result<()> {
        let mut state = self.state.write().await;
        if state.roles.contains_key(&role.name) {
            return Err(AuthzError::StoreMutation(format!(
                "Role {} already exists",
                role.name
            )));
        }

        debug!(role = %role.name, superuser = role.is_superuser, "Creating role");
        state.roles.insert(role.name.clone(), role);
        state.bump();
        Ok(())
    }

    /// ALTER ROLE; `None` leaves a flag unchanged
    pub async fn alter_role(
        &self,
        name: &str,
        is_superuser: Option<bool>,
        can_login: Option<bool>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .get_mut(name)
            .ok_or_else(|| AuthzError::StoreMutation(format!("Role {} does not exist", name)))?;

        if let Some(flag) = is_superuser {
            role.is_superuser = flag;
        }
        if let Some(flag) = can_login {
            role.can_login = flag;
        }

        state.bump();
        Ok(())
    }

    /// DROP ROLE
    ///
    /// Also removes the role's grants, its membership edges in both
    /// directions, and every grant on the role as a resource.
    pub async fn drop_role(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.roles.remove(name).is_none() {
            return Err(AuthzError::StoreMutation(format!("Role {} does not exist", name)));
        }

        let as_resource = Resource::role(name);
        state
            .grants
            .retain(|g| g.role != name && g.resource != as_resource);
        state
            .role_edges
            .retain(|e| e.member != name && e.granted != name);

        state.bump();
        Ok(())
    }
}

impl Default for InMemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn snapshot(&self) -> Result<Snapshot> {
        let delay = self.snapshot_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(AuthzError::StoreUnavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }

        let state = self.state.read().await;
        Ok(Snapshot {
            roles: state.roles.clone(),
            grants: state.grants.clone(),
            role_edges: state.role_edges.clone(),
            version: state.version,
            captured_at: Utc::now(),
        })
    }

    async fn mutate(&self, op: Mutation) -> Result<()> {
        let mut state = self.state.write().await;
        let description = op.to_string();

        if state.apply(op)? {
            state.bump();
            debug!(mutation = %description, version = state.version, "Applied mutation");
        } else {
            debug!(mutation = %description, "Mutation was a no-op");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_roles(names: &[&str]) -> InMemoryPermissionStore {
        let store = InMemoryPermissionStore::new();
        for name in names {
            store.create_role(Role::login(*name)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let store = store_with_roles(&["alice"]).await;
        let grant = Grant::new("alice", Permission::Select, Resource::keyspace("ks"));

        store.mutate(Mutation::Grant(grant.clone())).await.unwrap();
        let v1 = store.version().await;
        store.mutate(Mutation::Grant(grant.clone())).await.unwrap();

        assert_eq!(store.version().await, v1, "duplicate grant must not bump version");
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.grants.len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_missing_grant_is_noop() {
        let store = store_with_roles(&["alice"]).await;
        let v0 = store.version().await;

        store
            .mutate(Mutation::Revoke(Grant::new(
                "alice",
                Permission::Drop,
                Resource::AllKeyspaces,
            )))
            .await
            .unwrap();

        assert_eq!(store.version().await, v0);
    }

    #[tokio::test]
    async fn test_grant_to_unknown_role_rejected() {
        let store = InMemoryPermissionStore::new();
        let result = store
            .mutate(Mutation::Grant(Grant::new(
                "ghost",
                Permission::Select,
                Resource::AllKeyspaces,
            )))
            .await;

        assert!(matches!(result, Err(AuthzError::StoreMutation(_))));
    }

    #[tokio::test]
    async fn test_revoke_one_permission_out_of_all() {
        let store = store_with_roles(&["alice"]).await;
        let ks = Resource::keyspace("ks");

        store
            .mutate(Mutation::Grant(Grant::new("alice", Permission::All, ks.clone())))
            .await
            .unwrap();
        store
            .mutate(Mutation::Revoke(Grant::new("alice", Permission::Drop, ks.clone())))
            .await
            .unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert!(!snapshot.contains_grant(&Grant::new("alice", Permission::All, ks.clone())));
        assert!(!snapshot.contains_grant(&Grant::new("alice", Permission::Drop, ks.clone())));
        assert!(snapshot.contains_grant(&Grant::new("alice", Permission::Select, ks.clone())));
        assert!(snapshot.contains_grant(&Grant::new("alice", Permission::Create, ks.clone())));
        // DESCRIBE means nothing on a keyspace; splitting ALL must not invent it
        assert!(!snapshot.contains_grant(&Grant::new("alice", Permission::Describe, ks.clone())));
        assert_eq!(snapshot.grants.len(), 5);
    }

    #[tokio::test]
    async fn test_revoke_one_permission_out_of_all_on_role() {
        let store = store_with_roles(&["alice", "bob"]).await;
        let bob = Resource::role("bob");

        store
            .mutate(Mutation::Grant(Grant::new("alice", Permission::All, bob.clone())))
            .await
            .unwrap();
        store
            .mutate(Mutation::Revoke(Grant::new("alice", Permission::Authorize, bob.clone())))
            .await
            .unwrap();

        let snapshot = store.snapshot().await.unwrap();
        let mut left: Vec<Permission> = snapshot.grants.iter().map(|g| g.permission).collect();
        left.sort_by_key(|p| p.as_str());
        assert_eq!(left, vec![Permission::Alter, Permission::Drop]);
    }

    #[tokio::test]
    async fn test_grant_on_unrepresentable_resource_rejected() {
        let store = store_with_roles(&["alice"]).await;
        let version = store.version().await;

        for resource in [
            Resource::keyspace("a/b"),
            Resource::table("ks", ""),
            Resource::keyspace("ks "),
        ] {
            let result = store
                .mutate(Mutation::Grant(Grant::new("alice", Permission::Select, resource)))
                .await;
            assert!(matches!(result, Err(AuthzError::InvalidInput(_))), "{:?}", result);
        }

        assert_eq!(store.version().await, version);
        assert!(store.snapshot().await.unwrap().grants.is_empty());
    }

    #[tokio::test]
    async fn test_revoke_all_removes_every_permission() {
        let store = store_with_roles(&["alice"]).await;
        let t = Resource::table("ks", "t");

        for p in [Permission::Select, Permission::Modify] {
            store
                .mutate(Mutation::Grant(Grant::new("alice", p, t.clone())))
                .await
                .unwrap();
        }
        store
            .mutate(Mutation::Revoke(Grant::new("alice", Permission::All, t)))
            .await
            .unwrap();

        assert!(store.snapshot().await.unwrap().grants.is_empty());
    }

    #[tokio::test]
    async fn test_store_rejects_membership_cycle() {
        let store = store_with_roles(&["a", "b"]).await;

        store
            .mutate(Mutation::GrantRole(RoleMembership::new("a", "b")))
            .await
            .unwrap();
        let result = store
            .mutate(Mutation::GrantRole(RoleMembership::new("b", "a")))
            .await;

        assert!(matches!(result, Err(AuthzError::StoreMutation(_))));
    }

    #[tokio::test]
    async fn test_drop_role_cascades() {
        let store = store_with_roles(&["alice", "bob"]).await;
        store
            .mutate(Mutation::Grant(Grant::new("alice", Permission::Select, Resource::AllKeyspaces)))
            .await
            .unwrap();
        store
            .mutate(Mutation::Grant(Grant::new("bob", Permission::Drop, Resource::role("alice"))))
            .await
            .unwrap();
        store
            .mutate(Mutation::GrantRole(RoleMembership::new("bob", "alice")))
            .await
            .unwrap();

        store.drop_role("alice").await.unwrap();

        let snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.grants.is_empty());
        assert!(snapshot.role_edges.is_empty());
        assert!(snapshot.role("alice").is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_snapshot() {
        let store = InMemoryPermissionStore::new();
        store.set_available(false);
        assert!(matches!(
            store.snapshot().await,
            Err(AuthzError::StoreUnavailable(_))
        ));

        store.set_available(true);
        assert!(store.snapshot().await.is_ok());
    }

    #[tokio::test]
    async fn test_seed_from_toml() {
        let seed = Seed::from_toml(
            r#"
            [[roles]]
            name = "admin"
            is_superuser = true
            can_login = true

            [[roles]]
            name = "analyst"

            [[roles]]
            name = "alice"
            can_login = true

            [[grants]]
            role = "analyst"
            permission = "SELECT"
            resource = "data/shop"

            [[memberships]]
            member = "alice"
            granted = "analyst"
            "#,
        )
        .unwrap();

        let store = InMemoryPermissionStore::from_seed(seed).await.unwrap();
        let snapshot = store.snapshot().await.unwrap();

        assert_eq!(snapshot.roles.len(), 3);
        assert!(snapshot.role("admin").unwrap().is_superuser);
        assert!(snapshot.contains_grant(&Grant::new(
            "analyst",
            Permission::Select,
            Resource::keyspace("shop")
        )));
        assert!(snapshot
            .role_edges
            .contains(&RoleMembership::new("alice", "analyst")));
    }
}
