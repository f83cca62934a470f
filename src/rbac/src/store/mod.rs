//! Permission store contract
//!
//! The store is the durable source of truth for role definitions, grants and
//! role memberships. It is owned by the catalog layer; the engine only reads
//! full snapshots from it and forwards authorized GRANT/REVOKE mutations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::Result;
use crate::types::{Grant, Role, RoleMembership, RoleName};

pub mod memory;

pub use memory::{InMemoryPermissionStore, Seed};

/// Immutable, versioned copy of the store's authorization state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Role definitions, including the superuser flag
    #[serde(default)]
    pub roles: HashMap<RoleName, Role>,

    /// Every grant tuple
    #[serde(default)]
    pub grants: HashSet<Grant>,

    /// Every membership edge
    #[serde(default)]
    pub role_edges: HashSet<RoleMembership>,

    /// Store version; grows with each change, may restart after a store reset
    pub version: u64,

    /// When the store produced this snapshot
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Snapshot with no roles, grants or edges at version 0
    pub fn empty() -> Self {
        Self {
            roles: HashMap::new(),
            grants: HashSet::new(),
            role_edges: HashSet::new(),
            version: 0,
            captured_at: Utc::now(),
        }
    }

    /// Role definition by name
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Whether the exact grant tuple is present
    pub fn contains_grant(&self, grant: &Grant) -> bool {
        self.grants.contains(grant)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single store mutation issued by a GRANT or REVOKE statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// GRANT permission ON resource TO role
    Grant(Grant),
    /// REVOKE permission ON resource FROM role
    Revoke(Grant),
    /// GRANT granted TO member
    GrantRole(RoleMembership),
    /// REVOKE granted FROM member
    RevokeRole(RoleMembership),
}

impl Mutation {
    /// Whether the mutation adds state
    pub fn is_grant(&self) -> bool {
        matches!(self, Mutation::Grant(_) | Mutation::GrantRole(_))
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Grant(g) => write!(f, "GRANT {}", g),
            Mutation::Revoke(g) => write!(
                f,
                "REVOKE {} ON {} FROM {}",
                g.permission, g.resource, g.role
            ),
            Mutation::GrantRole(e) => write!(f, "GRANT {} TO {}", e.granted, e.member),
            Mutation::RevokeRole(e) => write!(f, "REVOKE {} FROM {}", e.granted, e.member),
        }
    }
}

/// Permission store trait
///
/// Implementations apply their own consistency protocol; the engine treats
/// the store as authoritative and slower than the cache.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Consistent, versioned view of all roles, grants and edges
    ///
    /// Fails with `StoreUnavailable` when the store cannot be reached.
    async fn snapshot(&self) -> Result<Snapshot>;

    /// Durably apply a single mutation
    ///
    /// Fails with `StoreMutation` when the store rejects the change.
    async fn mutate(&self, op: Mutation) -> Result<()>;
}
