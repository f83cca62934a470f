//! Error types for the authorization engine

use thiserror::Error;

use crate::roles::GraphError;
use crate::scope::{Resource, ScopeError};
use crate::types::{Permission, RoleName};

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The principal lacks the permission the statement requires.
    ///
    /// Terminal: surfaced to the statement layer and never retried.
    #[error("User {role} has no {permission} permission on {} or any of its parents", resource.describe())]
    Unauthorized {
        role: RoleName,
        permission: Permission,
        resource: Resource,
    },

    /// Role membership change would create a cycle
    #[error("Role graph error: {0}")]
    Cycle(#[from] GraphError),

    /// Permission store could not produce a snapshot
    #[error("Permission store unavailable: {0}")]
    StoreUnavailable(String),

    /// Permission store rejected a mutation
    #[error("Permission store rejected mutation: {0}")]
    StoreMutation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// Build an `Unauthorized` error for a failed obligation
    pub fn unauthorized(role: impl Into<RoleName>, permission: Permission, resource: Resource) -> Self {
        Self::Unauthorized {
            role: role.into(),
            permission,
            resource,
        }
    }

    /// Whether this error is an authorization denial
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<ScopeError> for AuthzError {
    fn from(err: ScopeError) -> Self {
        AuthzError::InvalidInput(err.to_string())
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
