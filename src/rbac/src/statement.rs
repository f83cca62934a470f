//! Statement permission map
//!
//! Translates a statement into the (permission, resource) obligations the
//! principal must satisfy before it executes, and into the store mutation
//! for GRANT/REVOKE statements.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scope::{Resource, ResourceHierarchy};
use crate::store::Mutation;
use crate::types::{Grant, Permission, RoleMembership, RoleName};

/// A parsed statement, reduced to what authorization needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    CreateKeyspace { keyspace: String },
    AlterKeyspace { keyspace: String },
    DropKeyspace { keyspace: String },
    CreateTable { keyspace: String, table: String },
    AlterTable { keyspace: String, table: String },
    DropTable { keyspace: String, table: String },
    Select { keyspace: String, table: String },
    Insert { keyspace: String, table: String },
    Update { keyspace: String, table: String },
    Delete { keyspace: String, table: String },
    Truncate { keyspace: String, table: String },
    GrantPermission {
        permission: Permission,
        resource: Resource,
        grantee: RoleName,
    },
    RevokePermission {
        permission: Permission,
        resource: Resource,
        grantee: RoleName,
    },
    /// GRANT `role` TO `grantee`
    GrantRole { role: RoleName, grantee: RoleName },
    /// REVOKE `role` FROM `grantee`
    RevokeRole { role: RoleName, grantee: RoleName },
    CreateRole { role: RoleName },
    AlterRole { role: RoleName },
    DropRole { role: RoleName },
    Use { keyspace: String },
}

/// A single check the principal must pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obligation {
    pub permission: Permission,
    pub resource: Resource,
}

impl Obligation {
    pub fn new(permission: Permission, resource: Resource) -> Self {
        Self {
            permission,
            resource,
        }
    }
}

impl fmt::Display for Obligation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.permission, self.resource)
    }
}

impl Statement {
    /// Statement keyword, for logs
    pub fn name(&self) -> &'static str {
        match self {
            Statement::CreateKeyspace { .. } => "CREATE KEYSPACE",
            Statement::AlterKeyspace { .. } => "ALTER KEYSPACE",
            Statement::DropKeyspace { .. } => "DROP KEYSPACE",
            Statement::CreateTable { .. } => "CREATE TABLE",
            Statement::AlterTable { .. } => "ALTER TABLE",
            Statement::DropTable { .. } => "DROP TABLE",
            Statement::Select { .. } => "SELECT",
            Statement::Insert { .. } => "INSERT",
            Statement::Update { .. } => "UPDATE",
            Statement::Delete { .. } => "DELETE",
            Statement::Truncate { .. } => "TRUNCATE",
            Statement::GrantPermission { .. } => "GRANT",
            Statement::RevokePermission { .. } => "REVOKE",
            Statement::GrantRole { .. } => "GRANT ROLE",
            Statement::RevokeRole { .. } => "REVOKE ROLE",
            Statement::CreateRole { .. } => "CREATE ROLE",
            Statement::AlterRole { .. } => "ALTER ROLE",
            Statement::DropRole { .. } => "DROP ROLE",
            Statement::Use { .. } => "USE",
        }
    }

    /// Checks required before the statement may execute
    ///
    /// Every obligation must hold; an empty list means no check.
    pub fn obligations(&self) -> Vec<Obligation> {
        use Permission::*;

        match self {
            Statement::CreateKeyspace { .. } => {
                vec![Obligation::new(Create, Resource::AllKeyspaces)]
            }
            Statement::AlterKeyspace { keyspace } => {
                vec![Obligation::new(Alter, Resource::keyspace(keyspace))]
            }
            Statement::DropKeyspace { keyspace } => {
                vec![Obligation::new(Drop, Resource::keyspace(keyspace))]
            }
            Statement::CreateTable { keyspace, .. } => {
                vec![Obligation::new(Create, Resource::keyspace(keyspace))]
            }
            Statement::AlterTable { keyspace, table } => {
                vec![Obligation::new(Alter, Resource::table(keyspace, table))]
            }
            Statement::DropTable { keyspace, table } => {
                vec![Obligation::new(Drop, Resource::table(keyspace, table))]
            }
            Statement::Select { keyspace, table } => {
                vec![Obligation::new(Select, Resource::table(keyspace, table))]
            }
            Statement::Insert { keyspace, table }
            | Statement::Update { keyspace, table }
            | Statement::Delete { keyspace, table }
            | Statement::Truncate { keyspace, table } => {
                vec![Obligation::new(Modify, Resource::table(keyspace, table))]
            }
            Statement::GrantPermission { resource, .. }
            | Statement::RevokePermission { resource, .. } => {
                vec![Obligation::new(Authorize, resource.clone())]
            }
            Statement::GrantRole { role, grantee } | Statement::RevokeRole { role, grantee } => {
                vec![
                    Obligation::new(Authorize, Resource::role(role)),
                    Obligation::new(Authorize, Resource::role(grantee)),
                ]
            }
            Statement::CreateRole { .. } => vec![Obligation::new(Create, Resource::AllRoles)],
            Statement::AlterRole { role } => vec![Obligation::new(Alter, Resource::role(role))],
            Statement::DropRole { role } => vec![Obligation::new(Drop, Resource::role(role))],
            Statement::Use { .. } => Vec::new(),
        }
    }

    /// Store mutation for GRANT/REVOKE statements
    pub fn mutation(&self) -> Option<Mutation> {
        match self {
            Statement::GrantPermission {
                permission,
                resource,
                grantee,
            } => Some(Mutation::Grant(Grant::new(
                grantee.clone(),
                *permission,
                resource.clone(),
            ))),
            Statement::RevokePermission {
                permission,
                resource,
                grantee,
            } => Some(Mutation::Revoke(Grant::new(
                grantee.clone(),
                *permission,
                resource.clone(),
            ))),
            Statement::GrantRole { role, grantee } => Some(Mutation::GrantRole(
                RoleMembership::new(grantee.clone(), role.clone()),
            )),
            Statement::RevokeRole { role, grantee } => Some(Mutation::RevokeRole(
                RoleMembership::new(grantee.clone(), role.clone()),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateKeyspace { keyspace }
            | Statement::AlterKeyspace { keyspace }
            | Statement::DropKeyspace { keyspace }
            | Statement::Use { keyspace } => write!(f, "{} {}", self.name(), keyspace),
            Statement::CreateTable { keyspace, table }
            | Statement::AlterTable { keyspace, table }
            | Statement::DropTable { keyspace, table } => {
                write!(f, "{} {}.{}", self.name(), keyspace, table)
            }
            Statement::Select { keyspace, table } | Statement::Delete { keyspace, table } => {
                write!(f, "{} FROM {}.{}", self.name(), keyspace, table)
            }
            Statement::Insert { keyspace, table } => {
                write!(f, "INSERT INTO {}.{}", keyspace, table)
            }
            Statement::Update { keyspace, table } | Statement::Truncate { keyspace, table } => {
                write!(f, "{} {}.{}", self.name(), keyspace, table)
            }
            Statement::GrantPermission {
                permission,
                resource,
                grantee,
            } => write!(f, "GRANT {} ON {} TO {}", permission, resource, grantee),
            Statement::RevokePermission {
                permission,
                resource,
                grantee,
            } => write!(f, "REVOKE {} ON {} FROM {}", permission, resource, grantee),
            Statement::GrantRole { role, grantee } => write!(f, "GRANT {} TO {}", role, grantee),
            Statement::RevokeRole { role, grantee } => {
                write!(f, "REVOKE {} FROM {}", role, grantee)
            }
            Statement::CreateRole { role }
            | Statement::AlterRole { role }
            | Statement::DropRole { role } => write!(f, "{} {}", self.name(), role),
        }
    }
}

/// Scopes at which a grant satisfies `permission` on `resource`
///
/// This is the resource's ancestor chain, most specific first, except that
/// dropping a keyspace is only satisfied at `ALL_KEYSPACES`: a DROP grant on
/// a keyspace covers its tables, not the keyspace itself.
pub fn scopes_for(permission: Permission, resource: &Resource) -> Vec<Resource> {
    match (permission, resource) {
        (Permission::Drop, Resource::Keyspace(_)) => vec![Resource::AllKeyspaces],
        _ => ResourceHierarchy::ancestors_of(resource),
    }
}
