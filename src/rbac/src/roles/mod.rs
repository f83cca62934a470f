//! Role membership module
//!
//! Provides the role membership graph used to expand a principal into its
//! effective roles.
//!
//! # Features
//!
//! - **Interned ids**: role names are mapped to dense ids once, adjacency lists
//!   are indexed by id
//! - **Cycle rejection**: an edge that would close a cycle is refused with the
//!   full cycle path
//! - **Snapshot rebuild**: [`RoleGraph::from_edges`] builds the graph installed
//!   alongside each cached snapshot
//!
//! # Example
//!
//! ```rust
//! use cretoai_rbac::roles::RoleGraph;
//!
//! let mut graph = RoleGraph::new();
//! graph.add_edge("bob", "ops").unwrap();
//! graph.add_edge("ops", "readers").unwrap();
//!
//! let roles = graph.effective_roles("bob");
//! assert!(roles.contains(&"readers"));
//! ```

pub mod graph;


pub use graph::{GraphError, RoleGraph};
