//! Role membership graph with interned role ids
//!
//! This module maintains the "is-member-of" relation between roles:
//! 1. Rejects membership edges that would close a cycle
//! 2. Computes effective roles (transitive closure) for a principal
//! 3. Rebuilds itself from the edge set of a store snapshot

use crate::types::{RoleMembership, RoleName};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Graph-related errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    /// Granting `granted` to `member` would close a membership cycle
    #[error("Granting {granted} to {member} would create a cycle: {}", path.join(" -> "))]
    Cycle {
        member: RoleName,
        granted: RoleName,
        /// Offending cycle, starting and ending at `member`
        path: Vec<RoleName>,
    },
}

/// Interned role identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct RoleId(u32);

impl RoleId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Directed acyclic graph of role memberships
///
/// An edge `member -> granted` means `member` inherits every permission held
/// by `granted`. Role names are interned once; adjacency lists are indexed by
/// id so closure computation never compares strings.
///
/// # Example
///
/// ```
/// use cretoai_rbac::roles::{GraphError, RoleGraph};
///
/// let mut graph = RoleGraph::new();
/// graph.add_edge("alice", "analyst")?;
/// graph.add_edge("analyst", "reader")?;
///
/// assert_eq!(graph.effective_roles("alice"), vec!["alice", "analyst", "reader"]);
/// assert!(graph.add_edge("reader", "alice").is_err());
/// # Ok::<(), GraphError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    /// Name → id lookup
    ids: HashMap<RoleName, RoleId>,

    /// Id → name lookup
    names: Vec<RoleName>,

    /// Roles directly granted to each role, indexed by member id
    granted: Vec<Vec<RoleId>>,

    /// Number of edges
    edge_count: usize,
}

impl RoleGraph {
    /// Create a new empty role graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from a set of membership edges
    ///
    /// Edges are applied in sorted order so the result does not depend on the
    /// iteration order of the source set. Edges that would close a cycle are
    /// skipped and returned alongside the graph.
    pub fn from_edges<'a, I>(edges: I) -> (Self, Vec<GraphError>)
    where
        I: IntoIterator<Item = &'a RoleMembership>,
    {
        let mut sorted: Vec<&RoleMembership> = edges.into_iter().collect();
        sorted.sort();

        let mut graph = Self::new();
        let mut rejected = Vec::new();

        for edge in sorted {
            if let Err(e) = graph.add_edge(&edge.member, &edge.granted) {
                rejected.push(e);
            }
        }

        (graph, rejected)
    }

    /// Number of distinct roles mentioned by at least one edge
    pub fn role_count(&self) -> usize {
        self.names.len()
    }

    /// Number of membership edges
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Whether `member -> granted` is present
    pub fn contains_edge(&self, member: &str, granted: &str) -> bool {
        match (self.ids.get(member), self.ids.get(granted)) {
            (Some(m), Some(g)) => self.granted[m.index()].contains(g),
            _ => false,
        }
    }

    /// Roles directly granted to `member`
    pub fn granted_to(&self, member: &str) -> Vec<&str> {
        self.ids
            .get(member)
            .map(|id| {
                self.granted[id.index()]
                    .iter()
                    .map(|g| self.names[g.index()].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All edges, sorted
    pub fn edges(&self) -> Vec<RoleMembership> {
        let mut edges: Vec<RoleMembership> = self
            .granted
            .iter()
            .enumerate()
            .flat_map(|(member, granted)| {
                granted.iter().map(move |g| {
                    RoleMembership::new(self.names[member].clone(), self.names[g.index()].clone())
                })
            })
            .collect();
        edges.sort();
        edges
    }

    /// Check whether `member -> granted` may be added without creating a cycle
    ///
    /// Read-only; used to reject a GRANT ROLE before it reaches the store.
    pub fn check_edge(&self, member: &str, granted: &str) -> Result<(), GraphError> {
        if member == granted {
            return Err(GraphError::Cycle {
                member: member.to_string(),
                granted: granted.to_string(),
                path: vec![member.to_string(), member.to_string()],
            });
        }

        // A cycle exists iff member is already reachable from granted
        if let Some(path) = self.find_path(granted, member) {
            let mut cycle = Vec::with_capacity(path.len() + 1);
            cycle.push(member.to_string());
            cycle.extend(path);
            return Err(GraphError::Cycle {
                member: member.to_string(),
                granted: granted.to_string(),
                path: cycle,
            });
        }

        Ok(())
    }

    /// Add a membership edge
    ///
    /// Returns `Ok(false)` if the edge already exists.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Cycle`] if `member` is already reachable from
    /// `granted` (or they are the same role). The graph is left unchanged.
    pub fn add_edge(&mut self, member: &str, granted: &str) -> Result<bool, GraphError> {
        if self.contains_edge(member, granted) {
            return Ok(false);
        }

        self.check_edge(member, granted)?;

        let member_id = self.intern(member);
        let granted_id = self.intern(granted);
        self.granted[member_id.index()].push(granted_id);
        self.edge_count += 1;

        Ok(true)
    }

    /// Remove a membership edge; returns whether it was present
    pub fn remove_edge(&mut self, member: &str, granted: &str) -> bool {
        let (Some(member_id), Some(granted_id)) =
            (self.ids.get(member).copied(), self.ids.get(granted).copied())
        else {
            return false;
        };

        let adjacency = &mut self.granted[member_id.index()];
        match adjacency.iter().position(|g| *g == granted_id) {
            Some(pos) => {
                adjacency.swap_remove(pos);
                self.edge_count -= 1;
                true
            }
            None => false,
        }
    }

    /// The role itself plus every role transitively granted to it
    ///
    /// Breadth-first, so directly granted roles come before inherited ones.
    /// A role the graph has never seen has only itself.
    pub fn effective_roles<'a>(&'a self, role: &'a str) -> Vec<&'a str> {
        let mut effective = vec![role];

        let Some(&start) = self.ids.get(role) else {
            return effective;
        };

        let mut visited = vec![false; self.names.len()];
        visited[start.index()] = true;

        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &next in &self.granted[current.index()] {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    effective.push(self.names[next.index()].as_str());
                    queue.push_back(next);
                }
            }
        }

        effective
    }

    fn intern(&mut self, name: &str) -> RoleId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }

        let id = RoleId(self.names.len() as u32);
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        self.granted.push(Vec::new());
        id
    }

    /// Shortest path `from -> ... -> to` along membership edges
    fn find_path(&self, from: &str, to: &str) -> Option<Vec<RoleName>> {
        let from_id = *self.ids.get(from)?;
        let to_id = *self.ids.get(to)?;

        let mut parent: Vec<Option<RoleId>> = vec![None; self.names.len()];
        let mut visited = vec![false; self.names.len()];
        visited[from_id.index()] = true;

        let mut queue = VecDeque::from([from_id]);
        while let Some(current) = queue.pop_front() {
            if current == to_id {
                let mut path = vec![self.names[current.index()].clone()];
                let mut cursor = current;
                while let Some(prev) = parent[cursor.index()] {
                    path.push(self.names[prev.index()].clone());
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }

            for &next in &self.granted[current.index()] {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    parent[next.index()] = Some(current);
                    queue.push_back(next);
                }
            }
        }

        None
    }
}
