//! Discrete-time SIS with Poisson-batched events.
//!
//! Time advances in unit steps. Per-node-per-step probabilities are
//! converted to additive Poisson intensities through −ln(1 − p); each step
//! draws a Poisson number of recovery and infection events, samples that
//! many targets with replacement from the corresponding weighted sets,
//! deduplicates each batch, and applies all recoveries before all
//! infections.

use crate::engine::{Dynamics, Engine, EngineState};
use crate::error::HocsimError;
use crate::hashing::{HashSet, HashSetExt};
use crate::network::{BipartiteNetwork, Edge, Group, Node};
use crate::roster::NodeState;
use crate::sampling::SamplableSet;
use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Discrete-time SIS process with per-step Poisson event counts.
pub type DiscreteSis = Engine<DiscreteSisDynamics>;

pub struct DiscreteSisDynamics {
    recovery_propensity: f64,
    // infection_propensity[n][i] = −ln(1 − π(n, i)), per susceptible member
    infection_propensity: Vec<Vec<f64>>,
    infection_set: SamplableSet<Group>,
    recovery_set: SamplableSet<Node>,
}

impl DiscreteSisDynamics {
    fn infection_propensity(&self, state: &EngineState, group: Group) -> f64 {
        let size = state.network().group_size(group);
        let infected = state.rosters().count(group, NodeState::Infected);
        let susceptible = state.rosters().count(group, NodeState::Susceptible) as f64;
        self.infection_propensity[size][infected] * susceptible
    }

    fn reweigh_adjacent_groups(
        &mut self,
        state: &EngineState,
        node: Node,
    ) -> Result<(), HocsimError> {
        for &group in state.network().adjacent_groups(node) {
            let propensity = self.infection_propensity(state, group);
            self.infection_set.update(group, propensity)?;
        }
        Ok(())
    }
}

fn propensity_of(probability: f64) -> Result<f64, HocsimError> {
    if !(0.0..1.0).contains(&probability) {
        return Err(HocsimError::InvalidOperation(format!(
            "per-step probability {probability} outside [0, 1)"
        )));
    }
    Ok(-(1.0 - probability).ln())
}

fn poisson_count<R: Rng>(mean: f64, rng: &mut R) -> Result<usize, HocsimError> {
    if mean <= 0.0 {
        return Ok(0);
    }
    let distribution = Poisson::new(mean)
        .map_err(|error| HocsimError::InvalidOperation(format!("poisson mean {mean}: {error}")))?;
    Ok(distribution.sample(rng) as usize)
}

impl Engine<DiscreteSisDynamics> {
    /// Creates the process over the network described by `edge_list`.
    ///
    /// `infection_probability[n][i]` is the per-step infection probability
    /// of one susceptible member of a group of size `n` with `i` infected
    /// members; `recovery_probability` the per-step recovery probability
    /// of an infected node. All probabilities must lie in [0, 1).
    pub fn new(
        edge_list: &[Edge],
        recovery_probability: f64,
        infection_probability: &[Vec<f64>],
    ) -> Result<Self, HocsimError> {
        let network = BipartiteNetwork::new(edge_list)?;
        let max_size = network.max_group_size();
        if infection_probability.len() <= max_size {
            return Err(HocsimError::InvalidOperation(format!(
                "infection probabilities cover sizes below {}, largest group has {max_size} members",
                infection_probability.len()
            )));
        }
        for (size, row) in infection_probability.iter().enumerate().take(max_size + 1) {
            if row.len() <= size {
                return Err(HocsimError::InvalidOperation(format!(
                    "infection probability row {size} has {} entries, needs {}",
                    row.len(),
                    size + 1
                )));
            }
        }
        let recovery_propensity = propensity_of(recovery_probability)?;
        let mut min = f64::INFINITY;
        let mut max = 0.0_f64;
        let mut infection_propensity = Vec::with_capacity(infection_probability.len());
        for row in infection_probability {
            let mut propensities = Vec::with_capacity(row.len());
            for &probability in row {
                let propensity = propensity_of(probability)?;
                propensities.push(propensity);
                if propensity > 0.0 {
                    min = min.min(propensity);
                    max = max.max(propensity);
                }
            }
            infection_propensity.push(propensities);
        }
        // group propensity scales with the susceptible count
        max *= network.max_group_size() as f64;
        let bounds = if max > 0.0 { (min, max) } else { (1.0, 1.0) };
        let dynamics = DiscreteSisDynamics {
            recovery_propensity,
            infection_propensity,
            infection_set: SamplableSet::new(bounds.0, bounds.1)?,
            recovery_set: SamplableSet::new(1.0, 1.0)?,
        };
        Ok(Engine::from_network(network, dynamics))
    }
}

impl Dynamics for DiscreteSisDynamics {
    const STATES: usize = 2;

    fn lifetime(&self, state: &EngineState) -> f64 {
        if state.infected_node_set().is_empty() {
            f64::INFINITY
        } else {
            1.0
        }
    }

    fn infect(&mut self, state: &mut EngineState, node: Node) -> Result<(), HocsimError> {
        state.transition(node, NodeState::Susceptible, NodeState::Infected)?;
        self.reweigh_adjacent_groups(state, node)?;
        self.recovery_set.insert(node, 1.0)
    }

    fn recover(&mut self, state: &mut EngineState, node: Node) -> Result<(), HocsimError> {
        state.transition(node, NodeState::Infected, NodeState::Susceptible)?;
        self.reweigh_adjacent_groups(state, node)?;
        self.recovery_set.erase(&node)
    }

    fn next_event(&mut self, state: &mut EngineState) -> Result<(), HocsimError> {
        state.current_time = state.last_event_time + self.lifetime(state);
        // recoveries: Poisson count, sampled with replacement, dedup
        let recovery_mean = self.recovery_propensity * self.recovery_set.len() as f64;
        let mut new_susceptible: HashSet<Node> = HashSet::new();
        for _ in 0..poisson_count(recovery_mean, &mut state.rng)? {
            let (node, _) = self.recovery_set.sample(&mut state.rng)?;
            new_susceptible.insert(node);
        }
        // infections: Poisson count over the total group propensity; each
        // drawn group infects one of its uniformly chosen susceptibles
        let infection_mean = self.infection_set.total_weight();
        let mut new_infected: HashSet<Node> = HashSet::new();
        for _ in 0..poisson_count(infection_mean, &mut state.rng)? {
            let (group, _) = self.infection_set.sample(&mut state.rng)?;
            let node = state
                .random_member(group, NodeState::Susceptible)
                .ok_or_else(|| {
                    HocsimError::InvariantViolation(format!(
                        "infection drawn in group {group} with no susceptible member"
                    ))
                })?;
            new_infected.insert(node);
        }
        // recoveries strictly before infections: a node appearing in both
        // batches recovers and is immediately re-infected
        for node in new_susceptible {
            self.recover(state, node)?;
        }
        for node in new_infected {
            self.infect(state, node)?;
        }
        state.last_event_time = state.current_time;
        Ok(())
    }

    fn clear_scheduler(&mut self) {
        self.infection_set.clear();
        self.recovery_set.clear();
    }
}
