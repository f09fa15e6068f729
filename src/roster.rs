//! Per-group, per-state member rosters with O(1) membership moves.
//!
//! Every process variant needs, for each group, the list of its members
//! currently in a given state: infections pick a uniform susceptible member
//! of the sampled group, recoveries a uniform infected one, and the group
//! rate itself depends on the infected count. The rosters partition each
//! group's members by state and keep a position map so a node can be moved
//! between state lists in constant time while both lists stay dense.

use crate::hashing::{HashMap, HashMapExt};
use crate::network::{BipartiteNetwork, Group, Node};

/// The epidemiological state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Susceptible,
    Infected,
    Recovered,
}

impl NodeState {
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Per-group partition of members by state, with a per-group position map.
#[derive(Debug, Clone)]
pub struct GroupRosters {
    // members[group][state][slot]
    members: Vec<Vec<Vec<Node>>>,
    // positions[group][node] = slot of node within its current state list
    positions: Vec<HashMap<Node, usize>>,
}

impl GroupRosters {
    /// Builds rosters for `network` with `state_count` per-group lists,
    /// placing every member in the susceptible list.
    pub fn new(network: &BipartiteNetwork, state_count: usize) -> Self {
        let mut members = Vec::with_capacity(network.number_of_groups());
        let mut positions = Vec::with_capacity(network.number_of_groups());
        for group in network.groups() {
            let mut lists = vec![Vec::new(); state_count];
            let mut group_positions = HashMap::with_capacity(network.group_size(group));
            for &node in network.group_members(group) {
                group_positions.insert(node, lists[0].len());
                lists[0].push(node);
            }
            members.push(lists);
            positions.push(group_positions);
        }
        GroupRosters { members, positions }
    }

    /// Members of `group` currently in `state`.
    pub fn members(&self, group: Group, state: NodeState) -> &[Node] {
        &self.members[group][state.index()]
    }

    /// Number of members of `group` currently in `state`.
    pub fn count(&self, group: Group, state: NodeState) -> usize {
        self.members[group][state.index()].len()
    }

    /// Moves `node` from the `from` list of `group` to its `to` list.
    ///
    /// The vacated slot is filled by swapping the list's last entry into
    /// it, so both lists stay dense and the move is O(1). The caller must
    /// guarantee that `node` currently sits in the `from` list.
    pub fn move_member(&mut self, group: Group, node: Node, from: NodeState, to: NodeState) {
        let lists = &mut self.members[group];
        let group_positions = &mut self.positions[group];
        let slot = group_positions[&node];
        let from_list = &mut lists[from.index()];
        let last = from_list.len() - 1;
        if slot < last {
            from_list.swap(slot, last);
            let displaced = from_list[slot];
            group_positions.insert(displaced, slot);
        }
        from_list.pop();
        group_positions.insert(node, lists[to.index()].len());
        lists[to.index()].push(node);
    }

    #[cfg(test)]
    pub(crate) fn position(&self, group: Group, node: Node) -> usize {
        self.positions[group][&node]
    }
}
