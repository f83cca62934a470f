//! Resource type definitions and parsing
//!
//! Resources are the objects permissions are granted on. They form two
//! shallow trees rooted at `data` (all keyspaces) and `roles` (all roles).

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Result type for scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors that can occur while parsing resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// Empty resource string provided
    EmptyResource,
    /// Unknown root segment
    UnknownRoot(String),
    /// Resource name segment is empty
    EmptySegment,
    /// Too many segments for the resource root
    TooDeep(String),
    /// Keyspace, table or role name that has no text form
    InvalidName(String),
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResource => write!(f, "Resource cannot be empty"),
            Self::UnknownRoot(root) => {
                write!(f, "Unknown resource root '{}', expected 'data' or 'roles'", root)
            }
            Self::EmptySegment => write!(f, "Resource name segment cannot be empty"),
            Self::TooDeep(raw) => write!(f, "Resource '{}' has too many segments", raw),
            Self::InvalidName(name) => write!(
                f,
                "Invalid resource name '{}': must be non-empty, contain no '/' and no surrounding whitespace",
                name
            ),
        }
    }
}

impl std::error::Error for ScopeError {}

/// Kind of a resource, without its names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    AllKeyspaces,
    Keyspace,
    Table,
    AllRoles,
    Role,
}

/// Object a permission is granted on
///
/// Canonical text form:
///
/// | Resource              | Text              |
/// |-----------------------|-------------------|
/// | all keyspaces         | `data`            |
/// | keyspace `ks`         | `data/ks`         |
/// | table `ks.t`          | `data/ks/t`       |
/// | all roles             | `roles`           |
/// | role `r`              | `roles/r`         |
///
/// # Examples
///
/// ```
/// use cretoai_rbac::scope::Resource;
///
/// let table: Resource = "data/shop/orders".parse().unwrap();
/// assert_eq!(table, Resource::table("shop", "orders"));
/// assert_eq!(table.to_string(), "data/shop/orders");
/// ```
///
/// Names are not checked on construction. A name that is empty, contains
/// `/` or carries surrounding whitespace would not survive the text form;
/// [`Resource::validate`] rejects it, and so do serialization and the stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Resource {
    AllKeyspaces,
    Keyspace(String),
    Table { keyspace: String, name: String },
    AllRoles,
    Role(String),
}

impl Resource {
    pub fn keyspace(name: impl Into<String>) -> Self {
        Resource::Keyspace(name.into())
    }

    pub fn table(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        Resource::Table {
            keyspace: keyspace.into(),
            name: name.into(),
        }
    }

    pub fn role(name: impl Into<String>) -> Self {
        Resource::Role(name.into())
    }

    /// Kind of this resource
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::AllKeyspaces => ResourceKind::AllKeyspaces,
            Resource::Keyspace(_) => ResourceKind::Keyspace,
            Resource::Table { .. } => ResourceKind::Table,
            Resource::AllRoles => ResourceKind::AllRoles,
            Resource::Role(_) => ResourceKind::Role,
        }
    }

    /// Whether this is one of the two top-level scopes
    pub fn is_root(&self) -> bool {
        matches!(self, Resource::AllKeyspaces | Resource::AllRoles)
    }

    /// Names carried by this resource, outermost first
    fn names(&self) -> Vec<&str> {
        match self {
            Resource::AllKeyspaces | Resource::AllRoles => Vec::new(),
            Resource::Keyspace(ks) => vec![ks.as_str()],
            Resource::Table { keyspace, name } => vec![keyspace.as_str(), name.as_str()],
            Resource::Role(role) => vec![role.as_str()],
        }
    }

    /// Check that every name survives the text form unchanged
    pub fn validate(&self) -> ScopeResult<()> {
        for name in self.names() {
            if name.is_empty() || name.contains('/') || name.trim() != name {
                return Err(ScopeError::InvalidName(name.to_string()));
            }
        }
        Ok(())
    }

    /// Human-readable form used in error messages
    pub fn describe(&self) -> String {
        match self {
            Resource::AllKeyspaces => "<all keyspaces>".to_string(),
            Resource::Keyspace(ks) => format!("<keyspace {}>", ks),
            Resource::Table { keyspace, name } => format!("<table {}.{}>", keyspace, name),
            Resource::AllRoles => "<all roles>".to_string(),
            Resource::Role(role) => format!("<role {}>", role),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::AllKeyspaces => write!(f, "data"),
            Resource::Keyspace(ks) => write!(f, "data/{}", ks),
            Resource::Table { keyspace, name } => write!(f, "data/{}/{}", keyspace, name),
            Resource::AllRoles => write!(f, "roles"),
            Resource::Role(role) => write!(f, "roles/{}", role),
        }
    }
}

impl FromStr for Resource {
    type Err = ScopeError;

    fn from_str(s: &str) -> ScopeResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScopeError::EmptyResource);
        }

        let segments: Vec<&str> = s.split('/').collect();
        if segments.iter().skip(1).any(|seg| seg.is_empty()) {
            return Err(ScopeError::EmptySegment);
        }

        let resource = match segments.as_slice() {
            ["data"] => Resource::AllKeyspaces,
            ["data", ks] => Resource::keyspace(*ks),
            ["data", ks, table] => Resource::table(*ks, *table),
            ["roles"] => Resource::AllRoles,
            ["roles", role] => Resource::role(*role),
            ["data", ..] | ["roles", ..] => return Err(ScopeError::TooDeep(s.to_string())),
            [root, ..] => return Err(ScopeError::UnknownRoot(root.to_string())),
            [] => return Err(ScopeError::EmptyResource),
        };

        resource.validate()?;
        Ok(resource)
    }
}

impl TryFrom<String> for Resource {
    type Error = ScopeError;

    fn try_from(value: String) -> ScopeResult<Self> {
        value.parse()
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.validate().map_err(S::Error::custom)?;
        serializer.collect_str(self)
    }
}
