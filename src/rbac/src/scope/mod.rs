//! Resource scopes and the hierarchy between them
//!
//! This module provides the resource model permissions are granted on and
//! the ancestor chains used to widen grant lookups.
//!
//! # Examples
//!
//! ```
//! use cretoai_rbac::scope::{Resource, ResourceHierarchy};
//!
//! let role: Resource = "roles/analyst".parse().unwrap();
//! assert!(ResourceHierarchy::is_ancestor_of(&Resource::AllRoles, &role));
//! assert!(!ResourceHierarchy::is_ancestor_of(&Resource::AllKeyspaces, &role));
//! ```

mod hierarchy;
mod types;


pub use hierarchy::ResourceHierarchy;
pub use types::{Resource, ResourceKind, ScopeError, ScopeResult};
