//! Immutable bipartite incidence structure between nodes and groups.
//!
//! A higher-order network is represented by its node–group incidence: each
//! node belongs to one or more groups and each group contains one or more
//! nodes. The structure is built once from an edge list and never mutated;
//! the simulation engine keeps all evolving state (node states, rosters)
//! outside of it.

use crate::error::HocsimError;
use crate::hashing::{HashSet, HashSetExt};
use crate::log::debug;
use std::ops::Range;

/// A node identifier. Labels are dense non-negative integers starting at 0.
pub type Node = usize;
/// A group identifier. Labels are dense non-negative integers starting at 0.
pub type Group = usize;
/// A single incidence between a node and a group it belongs to.
pub type Edge = (Node, Group);

/// Node–group incidence with cached membership and group-size extrema.
#[derive(Debug, Clone)]
pub struct BipartiteNetwork {
    node_adjacency: Vec<Vec<Group>>,
    group_adjacency: Vec<Vec<Node>>,
    min_membership: usize,
    max_membership: usize,
    min_group_size: usize,
    max_group_size: usize,
}

impl BipartiteNetwork {
    /// Builds the network from an edge list. The number of nodes and groups
    /// is derived as the largest label on each side plus one.
    ///
    /// Fails on an empty edge list or a repeated (node, group) pair; a
    /// duplicate incidence would corrupt the per-group roster bookkeeping
    /// that assumes each member appears once.
    pub fn new(edge_list: &[Edge]) -> Result<Self, HocsimError> {
        if edge_list.is_empty() {
            return Err(HocsimError::InvalidOperation(
                "cannot build a network from an empty edge list".to_string(),
            ));
        }

        let mut number_of_nodes = 0;
        let mut number_of_groups = 0;
        let mut seen: HashSet<Edge> = HashSet::with_capacity(edge_list.len());
        for &(node, group) in edge_list {
            if !seen.insert((node, group)) {
                return Err(HocsimError::InvalidOperation(format!(
                    "duplicate incidence ({node}, {group}) in edge list"
                )));
            }
            number_of_nodes = number_of_nodes.max(node);
            number_of_groups = number_of_groups.max(group);
        }
        // Labels start at 0 by convention.
        number_of_nodes += 1;
        number_of_groups += 1;

        let mut node_adjacency = vec![Vec::new(); number_of_nodes];
        let mut group_adjacency = vec![Vec::new(); number_of_groups];
        for &(node, group) in edge_list {
            node_adjacency[node].push(group);
            group_adjacency[group].push(node);
        }

        let min_membership = node_adjacency.iter().map(Vec::len).min().unwrap_or(0);
        let max_membership = node_adjacency.iter().map(Vec::len).max().unwrap_or(0);
        let min_group_size = group_adjacency.iter().map(Vec::len).min().unwrap_or(0);
        let max_group_size = group_adjacency.iter().map(Vec::len).max().unwrap_or(0);

        debug!(
            "built bipartite network: {number_of_nodes} nodes, {number_of_groups} groups, \
             group sizes {min_group_size}..={max_group_size}"
        );

        Ok(BipartiteNetwork {
            node_adjacency,
            group_adjacency,
            min_membership,
            max_membership,
            min_group_size,
            max_group_size,
        })
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.node_adjacency.len()
    }

    /// Number of nodes (alias of [`size`](Self::size)).
    pub fn number_of_nodes(&self) -> usize {
        self.node_adjacency.len()
    }

    /// Number of groups.
    pub fn number_of_groups(&self) -> usize {
        self.group_adjacency.len()
    }

    /// Number of groups containing `node`.
    pub fn membership(&self, node: Node) -> usize {
        self.node_adjacency[node].len()
    }

    /// Number of member nodes of `group`.
    pub fn group_size(&self, group: Group) -> usize {
        self.group_adjacency[group].len()
    }

    /// Member nodes of `group`, in edge-list order.
    pub fn group_members(&self, group: Group) -> &[Node] {
        &self.group_adjacency[group]
    }

    /// Groups containing `node`, in edge-list order.
    pub fn adjacent_groups(&self, node: Node) -> &[Group] {
        &self.node_adjacency[node]
    }

    /// All node labels.
    pub fn nodes(&self) -> Range<Node> {
        0..self.size()
    }

    /// All group labels.
    pub fn groups(&self) -> Range<Group> {
        0..self.number_of_groups()
    }

    pub fn min_membership(&self) -> usize {
        self.min_membership
    }

    pub fn max_membership(&self) -> usize {
        self.max_membership
    }

    pub fn min_group_size(&self) -> usize {
        self.min_group_size
    }

    pub fn max_group_size(&self) -> usize {
        self.max_group_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Vec<Edge> {
        // nodes 0..=3; node 1 and 2 shared between groups
        vec![(0, 0), (1, 0), (2, 0), (1, 1), (2, 1), (3, 1)]
    }

    #[test]
    fn builds_adjacency_both_ways() {
        let network = BipartiteNetwork::new(&two_triangles()).unwrap();
        assert_eq!(network.size(), 4);
        assert_eq!(network.number_of_groups(), 2);
        assert_eq!(network.group_members(0), &[0, 1, 2]);
        assert_eq!(network.group_members(1), &[1, 2, 3]);
        assert_eq!(network.adjacent_groups(1), &[0, 1]);
        assert_eq!(network.adjacent_groups(3), &[1]);
    }

    #[test]
    fn incidence_is_symmetric() {
        let network = BipartiteNetwork::new(&two_triangles()).unwrap();
        for node in network.nodes() {
            for &group in network.adjacent_groups(node) {
                assert!(network.group_members(group).contains(&node));
            }
        }
        for group in network.groups() {
            for &node in network.group_members(group) {
                assert!(network.adjacent_groups(node).contains(&group));
            }
        }
    }

    #[test]
    fn caches_extrema() {
        let network = BipartiteNetwork::new(&two_triangles()).unwrap();
        assert_eq!(network.min_membership(), 1);
        assert_eq!(network.max_membership(), 2);
        assert_eq!(network.min_group_size(), 3);
        assert_eq!(network.max_group_size(), 3);
    }

    #[test]
    fn rejects_empty_edge_list() {
        assert!(BipartiteNetwork::new(&[]).is_err());
    }

    #[test]
    fn rejects_duplicate_incidence() {
        let edges = vec![(0, 0), (1, 0), (0, 0)];
        assert!(BipartiteNetwork::new(&edges).is_err());
    }
}
