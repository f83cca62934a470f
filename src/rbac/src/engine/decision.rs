//! Authorization decision types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scope::Resource;
use crate::types::{Permission, RoleName};

/// Outcome of a single authorization check, with the reason for logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Principal is a superuser; no grant was consulted
    Superuser,

    /// A grant held by `role` (the principal or one of its effective roles)
    /// at `scope` satisfied the check
    Granted {
        role: RoleName,
        permission: Permission,
        scope: Resource,
    },

    /// No effective role holds the permission at any eligible scope
    Denied,
}

impl Decision {
    /// Whether the check passed
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Denied)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Superuser => f.write_str("ALLOW (superuser)"),
            Decision::Granted {
                role,
                permission,
                scope,
            } => write!(f, "ALLOW ({} on {} via {})", permission, scope, role),
            Decision::Denied => f.write_str("DENY"),
        }
    }
}
