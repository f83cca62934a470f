//! Resource hierarchy and ancestor chain building
//!
//! Maps a resource to its ancestor chain, most specific first:
//!
//! ```text
//! data/ks/t  →  [data/ks/t, data/ks, data]
//! roles/r    →  [roles/r, roles]
//! ```
//!
//! A grant on any element of the chain covers the resource itself.

use super::types::Resource;

/// Pure, total mapping from a resource to its ancestors
///
/// # Examples
///
/// ```
/// use cretoai_rbac::scope::{Resource, ResourceHierarchy};
///
/// let chain = ResourceHierarchy::ancestors_of(&Resource::table("ks", "t"));
/// assert_eq!(
///     chain,
///     vec![Resource::table("ks", "t"), Resource::keyspace("ks"), Resource::AllKeyspaces]
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceHierarchy;

impl ResourceHierarchy {
    /// Maximum chain length (table → keyspace → all keyspaces)
    pub const MAX_DEPTH: usize = 3;

    /// Immediate parent of a resource, `None` for the top-level scopes
    pub fn parent(resource: &Resource) -> Option<Resource> {
        match resource {
            Resource::AllKeyspaces | Resource::AllRoles => None,
            Resource::Keyspace(_) => Some(Resource::AllKeyspaces),
            Resource::Table { keyspace, .. } => Some(Resource::Keyspace(keyspace.clone())),
            Resource::Role(_) => Some(Resource::AllRoles),
        }
    }

    /// Top-level scope the resource lives under
    pub fn root_of(resource: &Resource) -> Resource {
        match resource {
            Resource::AllKeyspaces | Resource::Keyspace(_) | Resource::Table { .. } => {
                Resource::AllKeyspaces
            }
            Resource::AllRoles | Resource::Role(_) => Resource::AllRoles,
        }
    }

    /// Ordered ancestor chain, starting with the resource itself and ending
    /// at its top-level scope
    pub fn ancestors_of(resource: &Resource) -> Vec<Resource> {
        let mut chain = Vec::with_capacity(Self::MAX_DEPTH);
        let mut current = Some(resource.clone());

        while let Some(node) = current {
            current = Self::parent(&node);
            chain.push(node);
        }

        chain
    }

    /// Whether `ancestor` appears in the chain of `resource` (a resource is
    /// its own ancestor)
    pub fn is_ancestor_of(ancestor: &Resource, resource: &Resource) -> bool {
        let mut current = Some(resource.clone());

        while let Some(node) = current {
            if &node == ancestor {
                return true;
            }
            current = Self::parent(&node);
        }

        false
    }
}
