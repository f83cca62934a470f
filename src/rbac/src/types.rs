//! Core authorization types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;
use crate::scope::{Resource, ResourceKind};

/// Unique role identifier
pub type RoleName = String;

/// A named identity that can hold grants and be a member of other roles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Role name
    pub name: RoleName,

    /// Superuser roles bypass every permission check
    #[serde(default)]
    pub is_superuser: bool,

    /// Whether the role may open sessions
    #[serde(default)]
    pub can_login: bool,
}

impl Role {
    /// Create a plain role (no superuser, no login)
    pub fn new(name: impl Into<RoleName>) -> Self {
        Self {
            name: name.into(),
            is_superuser: false,
            can_login: false,
        }
    }

    /// Create a role that can log in
    pub fn login(name: impl Into<RoleName>) -> Self {
        Self::new(name).with_login(true)
    }

    /// Set the superuser flag
    pub fn with_superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = is_superuser;
        self
    }

    /// Set the login flag
    pub fn with_login(mut self, can_login: bool) -> Self {
        self.can_login = can_login;
        self
    }
}

/// Permission on a resource
///
/// `All` is a pseudo-permission standing for every individual permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Alter,
    Authorize,
    Create,
    Describe,
    Drop,
    Modify,
    Select,
    All,
}

impl Permission {
    /// Every individual permission, in catalog order
    pub const INDIVIDUAL: [Permission; 7] = [
        Permission::Alter,
        Permission::Authorize,
        Permission::Create,
        Permission::Describe,
        Permission::Drop,
        Permission::Modify,
        Permission::Select,
    ];

    /// Individual permissions this permission stands for
    pub fn expand(self) -> &'static [Permission] {
        match self {
            Permission::All => &Self::INDIVIDUAL,
            Permission::Alter => &[Permission::Alter],
            Permission::Authorize => &[Permission::Authorize],
            Permission::Create => &[Permission::Create],
            Permission::Describe => &[Permission::Describe],
            Permission::Drop => &[Permission::Drop],
            Permission::Modify => &[Permission::Modify],
            Permission::Select => &[Permission::Select],
        }
    }

    /// Individual permissions that have a meaning on a resource of `kind`
    ///
    /// This is what `ALL` stands for when it is split by a partial revoke.
    pub fn applicable_to(kind: ResourceKind) -> &'static [Permission] {
        match kind {
            ResourceKind::AllKeyspaces | ResourceKind::Keyspace => &[
                Permission::Alter,
                Permission::Authorize,
                Permission::Create,
                Permission::Drop,
                Permission::Modify,
                Permission::Select,
            ],
            ResourceKind::Table => &[
                Permission::Alter,
                Permission::Authorize,
                Permission::Drop,
                Permission::Modify,
                Permission::Select,
            ],
            ResourceKind::AllRoles => &[
                Permission::Alter,
                Permission::Authorize,
                Permission::Create,
                Permission::Describe,
                Permission::Drop,
            ],
            ResourceKind::Role => &[Permission::Alter, Permission::Authorize, Permission::Drop],
        }
    }

    /// Whether this is the `ALL` pseudo-permission
    pub fn is_all(self) -> bool {
        self == Permission::All
    }

    /// Upper-case statement keyword
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Alter => "ALTER",
            Permission::Authorize => "AUTHORIZE",
            Permission::Create => "CREATE",
            Permission::Describe => "DESCRIBE",
            Permission::Drop => "DROP",
            Permission::Modify => "MODIFY",
            Permission::Select => "SELECT",
            Permission::All => "ALL",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let permission = match s.trim().to_ascii_uppercase().as_str() {
            "ALTER" => Permission::Alter,
            "AUTHORIZE" => Permission::Authorize,
            "CREATE" => Permission::Create,
            "DESCRIBE" => Permission::Describe,
            "DROP" => Permission::Drop,
            "MODIFY" => Permission::Modify,
            "SELECT" => Permission::Select,
            "ALL" | "ALL PERMISSIONS" => Permission::All,
            other => {
                return Err(AuthzError::InvalidInput(format!(
                    "unknown permission '{}'",
                    other
                )))
            }
        };
        Ok(permission)
    }
}

/// Association of a role, a permission and a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub role: RoleName,
    pub permission: Permission,
    pub resource: Resource,
}

impl Grant {
    pub fn new(role: impl Into<RoleName>, permission: Permission, resource: Resource) -> Self {
        Self {
            role: role.into(),
            permission,
            resource,
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ON {} TO {}", self.permission, self.resource, self.role)
    }
}

/// Directed membership edge: `member` inherits the permissions of `granted`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleMembership {
    pub member: RoleName,
    pub granted: RoleName,
}

impl RoleMembership {
    pub fn new(member: impl Into<RoleName>, granted: impl Into<RoleName>) -> Self {
        Self {
            member: member.into(),
            granted: granted.into(),
        }
    }
}

impl fmt::Display for RoleMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.member, self.granted)
    }
}
