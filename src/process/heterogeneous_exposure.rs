//! Discrete-time contagion driven by heterogeneous dose exposure.
//!
//! Infection is not rate-based: at each unit step, every susceptible member
//! of a group with infected fraction ρ_g = i_g / (|g| − 1) draws a random
//! participation time τ from a truncated power law on [1, T] and accumulates
//! an exponentially distributed dose κ = −β · τ · ρ_g · ln(1 − r). The node
//! is infected when its dose exceeds the threshold. Recovery follows the
//! discrete Poisson recipe of the discrete-time SIS variant.

use crate::engine::{Dynamics, Engine, EngineState};
use crate::error::HocsimError;
use crate::hashing::{HashSet, HashSetExt};
use crate::network::{BipartiteNetwork, Edge, Node};
use crate::roster::NodeState;
use crate::sampling::SamplableSet;
use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Discrete-time process with per-step dose-threshold infections.
pub type HeterogeneousExposure = Engine<HeterogeneousExposureDynamics>;

pub struct HeterogeneousExposureDynamics {
    recovery_propensity: f64,
    participation_exponent: f64,
    max_participation_time: f64,
    dose_scale: f64,
    dose_threshold: f64,
    recovery_set: SamplableSet<Node>,
}

impl HeterogeneousExposureDynamics {
    /// Inverse-CDF draw from the power law with exponent α truncated on
    /// [1, T].
    fn participation_time<R: Rng>(&self, rng: &mut R) -> f64 {
        let alpha = self.participation_exponent;
        let r = rng.random::<f64>();
        (1.0 / (1.0 - r * (1.0 - self.max_participation_time.powf(-alpha)))).powf(1.0 / alpha)
    }

    fn dose<R: Rng>(&self, participation_time: f64, infected_fraction: f64, rng: &mut R) -> f64 {
        let r = rng.random::<f64>();
        -self.dose_scale * participation_time * infected_fraction * (1.0 - r).ln()
    }
}

impl Engine<HeterogeneousExposureDynamics> {
    /// Creates the process over the network described by `edge_list`.
    ///
    /// `participation_exponent` (α) and `max_participation_time` (T)
    /// shape the participation-time distribution, `dose_scale` (β) the
    /// dose magnitude, and `dose_threshold` the exposure a susceptible
    /// member must accumulate in one step to become infected.
    pub fn new(
        edge_list: &[Edge],
        recovery_probability: f64,
        participation_exponent: f64,
        max_participation_time: f64,
        dose_scale: f64,
        dose_threshold: f64,
    ) -> Result<Self, HocsimError> {
        let network = BipartiteNetwork::new(edge_list)?;
        if !(0.0..1.0).contains(&recovery_probability) {
            return Err(HocsimError::InvalidOperation(format!(
                "per-step probability {recovery_probability} outside [0, 1)"
            )));
        }
        if participation_exponent <= 0.0 || max_participation_time < 1.0 {
            return Err(HocsimError::InvalidOperation(format!(
                "participation time power law (exponent {participation_exponent}, \
                 truncation {max_participation_time}) is not a distribution on [1, T]"
            )));
        }
        let dynamics = HeterogeneousExposureDynamics {
            recovery_propensity: -(1.0 - recovery_probability).ln(),
            participation_exponent,
            max_participation_time,
            dose_scale,
            dose_threshold,
            recovery_set: SamplableSet::new(1.0, 1.0)?,
        };
        Ok(Engine::from_network(network, dynamics))
    }
}

impl Dynamics for HeterogeneousExposureDynamics {
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
        self.recovery_set.insert(node, 1.0)
    }

    fn recover(&mut self, state: &mut EngineState, node: Node) -> Result<(), HocsimError> {
        state.transition(node, NodeState::Infected, NodeState::Susceptible)?;
        self.recovery_set.erase(&node)
    }

    fn next_event(&mut self, state: &mut EngineState) -> Result<(), HocsimError> {
        state.current_time = state.last_event_time + self.lifetime(state);
        // recoveries: Poisson count, sampled with replacement, dedup
        let recovery_mean = self.recovery_propensity * self.recovery_set.len() as f64;
        let mut new_susceptible: HashSet<Node> = HashSet::new();
        if recovery_mean > 0.0 {
            let distribution = Poisson::new(recovery_mean).map_err(|error| {
                HocsimError::InvalidOperation(format!("poisson mean {recovery_mean}: {error}"))
            })?;
            for _ in 0..distribution.sample(&mut state.rng) as usize {
                let (node, _) = self.recovery_set.sample(&mut state.rng)?;
                new_susceptible.insert(node);
            }
        }
        // exposure check for every susceptible member of every group that
        // holds at least one infected and one other member
        let mut new_infected: HashSet<Node> = HashSet::new();
        {
            let EngineState {
                network,
                rosters,
                rng,
                ..
            } = state;
            for group in network.groups() {
                let size = network.group_size(group);
                let infected = rosters.count(group, NodeState::Infected);
                if size < 2 || infected == 0 {
                    continue;
                }
                let infected_fraction = infected as f64 / (size - 1) as f64;
                for &node in rosters.members(group, NodeState::Susceptible) {
                    let participation_time = self.participation_time(rng);
                    let dose = self.dose(participation_time, infected_fraction, rng);
                    if dose > self.dose_threshold {
                        new_infected.insert(node);
                    }
                }
            }
        }
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
        self.recovery_set.clear();
    }
}
