//! Snapshot-backed permission cache
//!
//! Readers clone an `Arc<CacheState>` under a lock held only for the pointer
//! clone; the refresher builds a new state off-lock and swaps it in. A reader
//! therefore always sees one complete snapshot, never a mix of two.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::roles::RoleGraph;
use crate::scope::Resource;
use crate::store::Snapshot;
use crate::types::{Permission, Role, RoleName};

/// Bit assigned to each permission in a grant mask
fn permission_bit(permission: Permission) -> u8 {
    match permission {
        Permission::Alter => 1 << 0,
        Permission::Authorize => 1 << 1,
        Permission::Create => 1 << 2,
        Permission::Describe => 1 << 3,
        Permission::Drop => 1 << 4,
        Permission::Modify => 1 << 5,
        Permission::Select => 1 << 6,
        Permission::All => 1 << 7,
    }
}

/// Grants indexed by role, then resource, as a permission bitmask
type GrantIndex = HashMap<RoleName, HashMap<Resource, u8>>;

/// One installed snapshot plus the structures derived from it
#[derive(Debug)]
pub struct CacheState {
    snapshot: Snapshot,
    graph: RoleGraph,
    index: GrantIndex,
}

impl CacheState {
    /// Derive the role graph and grant index from a snapshot
    ///
    /// Membership edges that would close a cycle are skipped and logged; the
    /// store is expected never to accept them.
    pub fn build(snapshot: Snapshot) -> Self {
        let (graph, rejected) = RoleGraph::from_edges(&snapshot.role_edges);
        for err in rejected {
            error!(version = snapshot.version, "Skipping membership edge from snapshot: {}", err);
        }

        let mut index: GrantIndex = HashMap::new();
        for grant in &snapshot.grants {
            *index
                .entry(grant.role.clone())
                .or_default()
                .entry(grant.resource.clone())
                .or_insert(0) |= permission_bit(grant.permission);
        }

        Self {
            snapshot,
            graph,
            index,
        }
    }

    /// State serving an empty snapshot at version 0
    pub fn empty() -> Self {
        Self::build(Snapshot::empty())
    }

    /// Whether `role` directly holds `permission` (or `ALL`) on exactly
    /// `resource`; no role or ancestor expansion
    pub fn check(&self, role: &str, permission: Permission, resource: &Resource) -> bool {
        let wanted = permission_bit(permission) | permission_bit(Permission::All);

        self.index
            .get(role)
            .and_then(|by_resource| by_resource.get(resource))
            .map(|mask| mask & wanted != 0)
            .unwrap_or(false)
    }

    /// Effective roles of `role` under this snapshot's membership graph
    pub fn effective_roles<'a>(&'a self, role: &'a str) -> Vec<&'a str> {
        self.graph.effective_roles(role)
    }

    /// Role definition under this snapshot
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.snapshot.role(name)
    }

    /// Membership graph derived from the snapshot
    pub fn graph(&self) -> &RoleGraph {
        &self.graph
    }

    /// The installed snapshot
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Version of the installed snapshot
    pub fn version(&self) -> u64 {
        self.snapshot.version
    }
}

/// Per-process cache of the permission store's state
#[derive(Debug)]
pub struct PermissionCache {
    state: RwLock<Arc<CacheState>>,
}

impl PermissionCache {
    /// Create a cache serving an empty snapshot
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(CacheState::empty())),
        }
    }

    /// Current state; cheap pointer clone
    pub fn load(&self) -> Arc<CacheState> {
        self.state.read().clone()
    }

    /// Version of the installed snapshot
    pub fn version(&self) -> u64 {
        self.state.read().version()
    }

    /// Convenience for `load().check(..)`
    pub fn check(&self, role: &str, permission: Permission, resource: &Resource) -> bool {
        self.load().check(role, permission, resource)
    }

    /// Replace the installed state with one built from `snapshot`
    ///
    /// Every snapshot is installed, whatever its version. A version lower
    /// than the installed one means the store was reset or restored and is
    /// logged as such. Callers serialize installs; see `Refresher`.
    ///
    /// Returns whether the version differs from the one previously installed.
    pub fn install(&self, snapshot: Snapshot) -> bool {
        let version = snapshot.version;
        let next = Arc::new(CacheState::build(snapshot));

        let previous = {
            let mut state = self.state.write();
            let previous = state.version();
            *state = next;
            previous
        };

        if version < previous {
            warn!(
                version,
                previous, "Permission store version went backwards; treating as a reset"
            );
        } else if version > previous {
            info!(version, previous, "Installed permission snapshot");
        }

        version != previous
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new()
    }
}
