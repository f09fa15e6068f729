//! Continuous-time SIS with node-level recovery and group-level infection.
//!
//! Recovery is a per-node event at a constant rate; infection is a
//! per-group event with an arbitrary kernel λ(|g|, i_g). Both kinds live in
//! one [`Event`]-keyed weighted set, and the drawn event is dispatched by
//! pattern match.

use crate::engine::{Dynamics, Engine, EngineState, Event};
use crate::error::HocsimError;
use crate::network::{BipartiteNetwork, Edge, Group, Node};
use crate::process::RateFunction;
use crate::roster::NodeState;
use crate::sampling::SamplableSet;

/// Continuous-time SIS process with constant node recovery and a group
/// infection kernel.
pub type GroupSis = Engine<GroupSisDynamics>;

pub struct GroupSisDynamics {
    recovery_rate: f64,
    infection_rate: RateFunction,
    event_set: SamplableSet<Event>,
}

impl GroupSisDynamics {
    fn infection_rate(&self, state: &EngineState, group: Group) -> f64 {
        (self.infection_rate)(
            state.network().group_size(group),
            state.rosters().count(group, NodeState::Infected),
        )
    }

    fn reweigh_adjacent_groups(
        &mut self,
        state: &EngineState,
        node: Node,
    ) -> Result<(), HocsimError> {
        for &group in state.network().adjacent_groups(node) {
            let rate = self.infection_rate(state, group);
            self.event_set.update(Event::GroupInfection(group), rate)?;
        }
        Ok(())
    }
}

impl Engine<GroupSisDynamics> {
    /// Creates the process over the network described by `edge_list`.
    ///
    /// `rate_bounds` is the (wmin, wmax) envelope; it must cover
    /// `recovery_rate` as well as λ over every reachable group state.
    pub fn new(
        edge_list: &[Edge],
        recovery_rate: f64,
        infection_rate: impl Fn(usize, usize) -> f64 + 'static,
        rate_bounds: (f64, f64),
    ) -> Result<Self, HocsimError> {
        let network = BipartiteNetwork::new(edge_list)?;
        let dynamics = GroupSisDynamics {
            recovery_rate,
            infection_rate: Box::new(infection_rate),
            event_set: SamplableSet::new(rate_bounds.0, rate_bounds.1)?,
        };
        Ok(Engine::from_network(network, dynamics))
    }

    /// Power-law specialisation:
    /// λ(n, i) = scale_infection · (n − i) · i^shape_infection.
    pub fn powerlaw(
        edge_list: &[Edge],
        recovery_rate: f64,
        scale_infection: f64,
        shape_infection: f64,
        rate_bounds: (f64, f64),
    ) -> Result<Self, HocsimError> {
        Self::new(
            edge_list,
            recovery_rate,
            move |size, infected| {
                scale_infection * (size - infected) as f64 * (infected as f64).powf(shape_infection)
            },
            rate_bounds,
        )
    }
}

impl Dynamics for GroupSisDynamics {
    const STATES: usize = 2;

    fn lifetime(&self, _state: &EngineState) -> f64 {
        if self.event_set.is_empty() {
            f64::INFINITY
        } else {
            1.0 / self.event_set.total_weight()
        }
    }

    fn infect(&mut self, state: &mut EngineState, node: Node) -> Result<(), HocsimError> {
        state.transition(node, NodeState::Susceptible, NodeState::Infected)?;
        self.reweigh_adjacent_groups(state, node)?;
        self.event_set
            .insert(Event::NodeRecovery(node), self.recovery_rate)
    }

    fn recover(&mut self, state: &mut EngineState, node: Node) -> Result<(), HocsimError> {
        state.transition(node, NodeState::Infected, NodeState::Susceptible)?;
        self.reweigh_adjacent_groups(state, node)?;
        self.event_set.erase(&Event::NodeRecovery(node))
    }

    fn next_event(&mut self, state: &mut EngineState) -> Result<(), HocsimError> {
        state.current_time = state.last_event_time + self.lifetime(state);
        let (event, _) = self.event_set.sample(&mut state.rng)?;
        match event {
            Event::NodeRecovery(node) => self.recover(state, node)?,
            Event::GroupInfection(group) => {
                let node = state
                    .random_member(group, NodeState::Susceptible)
                    .ok_or_else(|| {
                        HocsimError::InvariantViolation(format!(
                            "infection drawn in group {group} with no susceptible member"
                        ))
                    })?;
                self.infect(state, node)?;
            }
        }
        state.last_event_time = state.current_time;
        Ok(())
    }

    fn clear_scheduler(&mut self) {
        self.event_set.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EvolveOptions;
    use crate::hashing::{HashSet, HashSetExt};

    fn one_group(size: usize) -> Vec<Edge> {
        (0..size).map(|node| (node, 0)).collect()
    }

    #[test]
    fn infection_schedules_recovery_event() {
        let mut engine =
            GroupSis::new(&one_group(4), 1.0, |_, _| 0.0, (1.0, 16.0)).unwrap();
        let mut nodes = HashSet::new();
        nodes.insert(2usize);
        engine.infect_node_set(&nodes).unwrap();
        assert!(engine
            .dynamics
            .event_set
            .contains(&Event::NodeRecovery(2)));
        // zero infection kernel: the group never enters the scheduler
        assert!(!engine
            .dynamics
            .event_set
            .contains(&Event::GroupInfection(0)));
        crate::assert_almost_eq!(engine.lifetime(), 1.0, 1e-12);
    }

    #[test]
    fn recovery_unschedules_node_and_reweighs_group() {
        let mut engine =
            GroupSis::new(&one_group(4), 1.0, |size, infected| (size * infected) as f64, (1.0, 32.0))
                .unwrap();
        let mut nodes = HashSet::new();
        nodes.insert(0usize);
        engine.infect_node_set(&nodes).unwrap();
        assert!(engine
            .dynamics
            .event_set
            .contains(&Event::GroupInfection(0)));
        engine.clear().unwrap();
        assert!(engine.dynamics.event_set.is_empty());
        assert_eq!(engine.number_of_infected_nodes(), 0);
    }

    #[test]
    fn powerlaw_kernel_vanishes_without_infected() {
        let engine = GroupSis::powerlaw(&one_group(10), 1.0, 0.5, 2.0, (0.5, 64.0)).unwrap();
        let kernel = &engine.dynamics.infection_rate;
        assert_eq!(kernel(10, 0), 0.0);
        crate::assert_almost_eq!(kernel(10, 2), 0.5 * 8.0 * 4.0, 1e-12);
    }

    #[test]
    fn quasistationary_powerlaw_run_stays_active() {
        let mut engine =
            GroupSis::powerlaw(&one_group(100), 1.0, 0.02, 1.0, (0.5, 256.0)).unwrap();
        engine.seed(9);
        engine.infect_fraction(0.4).unwrap();
        engine.initialize_history(25);
        engine
            .evolve(
                50.0,
                EvolveOptions {
                    decorrelation_time: 0.5,
                    quasistationary: true,
                    ..EvolveOptions::default()
                },
            )
            .unwrap();
        assert!(engine.number_of_infected_nodes() > 0);
        assert_eq!(engine.current_time(), 50.0);
    }
}
