//! # CretoAI RBAC Engine
//!
//! Role-based authorization for statement execution in a distributed tabular
//! database.
//!
//! ## Features
//!
//! - **Resource hierarchy**: grants on a keyspace cover its tables, grants on
//!   `ALL KEYSPACES` / `ALL ROLES` cover everything below them
//! - **Role inheritance** through an acyclic membership graph
//! - **Superuser bypass** driven by the role's current definition
//! - **Bounded-staleness cache**: decisions are answered from an in-memory
//!   snapshot refreshed in the background, never blocking on the store
//! - **Mutation gating** for GRANT/REVOKE with cycle rejection
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cretoai_rbac::{
//!     AuthorizationEngine, EngineConfig, Grant, InMemoryPermissionStore, Mutation,
//!     Permission, PermissionStore, Resource, Role,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryPermissionStore::new();
//!     store.create_role(Role::login("alice")).await?;
//!     store
//!         .mutate(Mutation::Grant(Grant::new("alice", Permission::Select, Resource::keyspace("shop"))))
//!         .await?;
//!
//!     let engine = AuthorizationEngine::start(EngineConfig::default(), Arc::new(store)).await?;
//!
//!     let alice = Role::login("alice");
//!     assert!(engine.authorize(&alice, Permission::Select, &Resource::table("shop", "orders")));
//!     assert!(!engine.authorize(&alice, Permission::Modify, &Resource::table("shop", "orders")));
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod roles;
pub mod scope;
pub mod session;
pub mod statement;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::RbacConfig;
pub use engine::{
    AuthorizationEngine, Decision, EngineConfig, EngineMetrics, PermissionCache, RefreshConfig,
    RefreshHandle,
};
pub use error::{AuthzError, Result};
pub use roles::{GraphError, RoleGraph};
pub use scope::{Resource, ResourceHierarchy, ResourceKind, ScopeError};
pub use session::{Outcome, Prepared, Session};
pub use statement::{Obligation, Statement};
pub use store::{InMemoryPermissionStore, Mutation, PermissionStore, Seed, Snapshot};
pub use types::{Grant, Permission, Role, RoleMembership, RoleName};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
