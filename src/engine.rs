//! The event-driven simulation engine shared by every process variant.
//!
//! The engine owns everything that evolves: the node state vector, the
//! per-group rosters, the infected set, the clocks, the RNG, the
//! quasi-stationary history buffer, and the registered measurement hooks.
//! What distinguishes one contagion process from another is captured by the
//! [`Dynamics`] trait: how long until the next event, how the next event is
//! drawn and applied, and what infecting or recovering a single node does to
//! the variant's event scheduler. The evolve/measure/quasi-stationary loop
//! is implemented once, here, over that capability set.

use crate::error::HocsimError;
use crate::hashing::HashSet;
use crate::log::trace;
use crate::measure::Measure;
use crate::network::{BipartiteNetwork, Group, Node};
use crate::roster::{GroupRosters, NodeState};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Number of stored configurations when the history buffer is created
/// implicitly by a quasi-stationary `evolve`.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// A schedulable event for variants that mix group-level infection events
/// with node-level recovery events in a single weighted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// An infection fires in this group; the infected node is drawn
    /// uniformly among the group's susceptible members.
    GroupInfection(Group),
    /// This node recovers.
    NodeRecovery(Node),
}

/// Knobs for [`Engine::evolve`]. The defaults mirror a plain unmeasured
/// run: decorrelation time 1, no measurement, no quasi-stationary support.
#[derive(Debug, Clone, Copy)]
pub struct EvolveOptions {
    /// Simulated-time spacing between measurement points.
    pub decorrelation_time: f64,
    /// Invoke the registered measurement hooks at each measurement point.
    pub measure: bool,
    /// Keep the process out of its absorbing state by replaying stored
    /// configurations.
    pub quasistationary: bool,
}

impl Default for EvolveOptions {
    fn default() -> Self {
        EvolveOptions {
            decorrelation_time: 1.0,
            measure: false,
            quasistationary: false,
        }
    }
}

/// The evolving state of a simulation, shared across variants and exposed
/// read-only to measurement hooks.
pub struct EngineState {
    pub(crate) network: BipartiteNetwork,
    pub(crate) node_states: Vec<NodeState>,
    pub(crate) rosters: GroupRosters,
    pub(crate) infected: HashSet<Node>,
    pub(crate) history: Vec<HashSet<Node>>,
    pub(crate) current_time: f64,
    pub(crate) last_event_time: f64,
    pub(crate) time_since_last_measure: f64,
    pub(crate) rng: SmallRng,
}

impl EngineState {
    fn new(network: BipartiteNetwork, state_count: usize) -> Self {
        let size = network.size();
        let rosters = GroupRosters::new(&network, state_count);
        EngineState {
            network,
            node_states: vec![NodeState::Susceptible; size],
            rosters,
            infected: HashSet::default(),
            history: Vec::new(),
            current_time: 0.0,
            last_event_time: 0.0,
            time_since_last_measure: 0.0,
            rng: SmallRng::seed_from_u64(0),
        }
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.network.size()
    }

    pub fn number_of_infected_nodes(&self) -> usize {
        self.infected.len()
    }

    pub fn infected_node_set(&self) -> &HashSet<Node> {
        &self.infected
    }

    pub fn node_states(&self) -> &[NodeState] {
        &self.node_states
    }

    pub fn network(&self) -> &BipartiteNetwork {
        &self.network
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub(crate) fn rosters(&self) -> &GroupRosters {
        &self.rosters
    }

    /// Moves `node` from `from` to `to`: state vector, infected set, and
    /// every roster of a group containing the node. Fails with
    /// [`HocsimError::InvariantViolation`] when the node is not in `from`.
    pub(crate) fn transition(
        &mut self,
        node: Node,
        from: NodeState,
        to: NodeState,
    ) -> Result<(), HocsimError> {
        if self.node_states[node] != from {
            return Err(HocsimError::InvariantViolation(format!(
                "transition of node {node} out of {from:?} requested, but the node is {:?}",
                self.node_states[node]
            )));
        }
        self.node_states[node] = to;
        if to == NodeState::Infected {
            self.infected.insert(node);
        } else if from == NodeState::Infected {
            self.infected.remove(&node);
        }
        let EngineState {
            network, rosters, ..
        } = self;
        for &group in network.adjacent_groups(node) {
            rosters.move_member(group, node, from, to);
        }
        Ok(())
    }

    /// Uniform draw among the members of `group` in `state`; `None` when
    /// that list is empty.
    pub(crate) fn random_member(&mut self, group: Group, state: NodeState) -> Option<Node> {
        let EngineState { rosters, rng, .. } = self;
        let members = rosters.members(group, state);
        if members.is_empty() {
            return None;
        }
        Some(members[rng.random_range(0..members.len())])
    }

    /// Replaces a uniformly chosen stored configuration with the current
    /// infected set (swap-to-back, pop, push).
    pub(crate) fn store_configuration(&mut self) {
        let index = self.rng.random_range(0..self.history.len());
        let last = self.history.len() - 1;
        self.history.swap(index, last);
        self.history.pop();
        self.history.push(self.infected.clone());
    }
}

/// The capability set a process variant supplies to the shared engine.
pub trait Dynamics {
    /// Number of node states the variant distinguishes (2 for the
    /// SIS family, 3 with an absorbing recovered state).
    const STATES: usize;

    /// Expected time to the next event: the reciprocal of the total event
    /// rate for continuous-time variants, 1 for discrete-time variants,
    /// and `f64::INFINITY` when no further event is possible.
    fn lifetime(&self, state: &EngineState) -> f64;

    /// Transitions `node` to infected and reweights the scheduler.
    fn infect(&mut self, state: &mut EngineState, node: Node) -> Result<(), HocsimError>;

    /// Transitions `node` out of infected and reweights the scheduler.
    fn recover(&mut self, state: &mut EngineState, node: Node) -> Result<(), HocsimError>;

    /// Draws and applies the next event, advancing `current_time` and
    /// `last_event_time` to the event instant. Only called while
    /// [`lifetime`](Self::lifetime) is finite.
    fn next_event(&mut self, state: &mut EngineState) -> Result<(), HocsimError>;

    /// Empties the variant's weighted sets. Called after every node has
    /// recovered so that rebuilt weights do not inherit accumulated
    /// floating-point drift.
    fn clear_scheduler(&mut self);
}

/// A contagion process: shared engine state plus variant dynamics plus the
/// registered measurement hooks.
pub struct Engine<D: Dynamics> {
    pub(crate) state: EngineState,
    pub(crate) dynamics: D,
    measures: Vec<Box<dyn Measure>>,
}

impl<D: Dynamics> Engine<D> {
    pub(crate) fn from_network(network: BipartiteNetwork, dynamics: D) -> Self {
        Engine {
            state: EngineState::new(network, D::STATES),
            dynamics,
            measures: Vec::new(),
        }
    }

    /// Reseeds the engine's random number generator.
    pub fn seed(&mut self, seed: u64) {
        trace!("reseeding engine rng (seed={seed})");
        self.state.rng = SmallRng::seed_from_u64(seed);
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.state.size()
    }

    pub fn number_of_infected_nodes(&self) -> usize {
        self.state.number_of_infected_nodes()
    }

    pub fn infected_node_set(&self) -> &HashSet<Node> {
        self.state.infected_node_set()
    }

    pub fn node_states(&self) -> &[NodeState] {
        self.state.node_states()
    }

    pub fn network(&self) -> &BipartiteNetwork {
        self.state.network()
    }

    pub fn current_time(&self) -> f64 {
        self.state.current_time()
    }

    /// Expected time to the next event (see [`Dynamics::lifetime`]).
    pub fn lifetime(&self) -> f64 {
        self.dynamics.lifetime(&self.state)
    }

    /// Read-only view of the evolving state, as handed to measurement
    /// hooks.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Registers a measurement hook, invoked by [`evolve`](Self::evolve)
    /// at each measurement point when measuring is enabled.
    pub fn add_measure<M: Measure + 'static>(&mut self, measure: M) {
        self.measures.push(Box::new(measure));
    }

    /// The registered measurement hooks, in registration order.
    pub fn measures(&self) -> &[Box<dyn Measure>] {
        &self.measures
    }

    /// Infects `floor(fraction * N)` distinct susceptible nodes drawn
    /// uniformly at random, redrawing on collisions.
    pub fn infect_fraction(&mut self, fraction: f64) -> Result<(), HocsimError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(HocsimError::InvalidOperation(format!(
                "infected fraction {fraction} outside [0, 1]"
            )));
        }
        let size = self.state.size();
        let target = (size as f64 * fraction).floor() as usize;
        let susceptible = self
            .state
            .node_states
            .iter()
            .filter(|&&state| state == NodeState::Susceptible)
            .count();
        if target > susceptible {
            return Err(HocsimError::InvalidOperation(format!(
                "cannot infect {target} nodes: only {susceptible} susceptible"
            )));
        }
        let Engine {
            state, dynamics, ..
        } = self;
        let mut count = 0;
        while count < target {
            let node = state.rng.random_range(0..size);
            if state.node_states[node] == NodeState::Susceptible {
                dynamics.infect(state, node)?;
                count += 1;
            }
        }
        Ok(())
    }

    /// Infects every node of `node_set` that is currently susceptible;
    /// other entries are silently skipped. Fails on out-of-range labels.
    pub fn infect_node_set(&mut self, node_set: &HashSet<Node>) -> Result<(), HocsimError> {
        let Engine {
            state, dynamics, ..
        } = self;
        for &node in node_set {
            if node >= state.size() {
                return Err(HocsimError::InvalidOperation(format!(
                    "node {node} outside the population"
                )));
            }
            if state.node_states[node] == NodeState::Susceptible {
                dynamics.infect(state, node)?;
            }
        }
        Ok(())
    }

    /// Recovers every currently infected node, as if all of them left the
    /// infected state at this instant, and empties the variant's weighted
    /// sets to cancel accumulated floating-point drift.
    pub fn clear(&mut self) -> Result<(), HocsimError> {
        let Engine {
            state, dynamics, ..
        } = self;
        clear_state(state, dynamics)
    }

    /// Clears the process, every measurement accumulator, and the history
    /// buffer, and zeroes all clocks.
    pub fn reset(&mut self) -> Result<(), HocsimError> {
        self.clear()?;
        for measure in &mut self.measures {
            measure.clear();
        }
        self.state.history.clear();
        self.state.current_time = 0.0;
        self.state.last_event_time = 0.0;
        self.state.time_since_last_measure = 0.0;
        Ok(())
    }

    /// Replaces the history buffer with `number_of_states` copies of the
    /// current infected set, guaranteeing that a first quasi-stationary
    /// restoration is always possible.
    pub fn initialize_history(&mut self, number_of_states: usize) {
        self.state.history = vec![self.state.infected.clone(); number_of_states];
    }

    /// Advances simulated time by exactly `period`.
    ///
    /// Events fire at their scheduled instants; between events, whenever
    /// more than `decorrelation_time` of simulated time has accumulated
    /// since the last measurement point, the registered hooks are invoked
    /// (if `measure`) and the current configuration is stored (if
    /// `quasistationary`). Measurement happens *before* the pending event,
    /// so a sample reflects the state just ahead of the event instant.
    /// In quasi-stationary mode, hitting the absorbing state triggers an
    /// immediate restoration from the history buffer, so the run never
    /// terminates early; otherwise absorption simply exhausts the period.
    pub fn evolve(&mut self, period: f64, options: EvolveOptions) -> Result<(), HocsimError> {
        if !period.is_finite() || period < 0.0 {
            return Err(HocsimError::InvalidOperation(format!(
                "evolution period {period} must be finite and non-negative"
            )));
        }
        if options.quasistationary && self.state.history.is_empty() {
            self.initialize_history(DEFAULT_HISTORY_SIZE);
        }
        let Engine {
            state,
            dynamics,
            measures,
        } = self;
        let initial_time = state.current_time;
        loop {
            let lifetime = dynamics.lifetime(state);
            if !(state.last_event_time + lifetime - initial_time < period) {
                break;
            }
            // Time from now to the event about to fire.
            state.time_since_last_measure += state.last_event_time + lifetime - state.current_time;
            if state.time_since_last_measure > options.decorrelation_time {
                state.time_since_last_measure -= options.decorrelation_time;
                if options.measure {
                    for measure in measures.iter_mut() {
                        measure.measure(state);
                    }
                }
                if options.quasistationary {
                    state.store_configuration();
                }
            }
            dynamics.next_event(state)?;
            if options.quasistationary && dynamics.lifetime(state).is_infinite() {
                restore_from_history(state, dynamics)?;
            }
        }
        state.time_since_last_measure += period - (state.last_event_time - initial_time);
        if state.time_since_last_measure > options.decorrelation_time {
            state.time_since_last_measure -= options.decorrelation_time;
            if options.measure {
                for measure in measures.iter_mut() {
                    measure.measure(state);
                }
            }
            if options.quasistationary {
                state.store_configuration();
            }
        }
        state.current_time = initial_time + period;
        Ok(())
    }
}

fn clear_state<D: Dynamics>(state: &mut EngineState, dynamics: &mut D) -> Result<(), HocsimError> {
    let infected: Vec<Node> = state.infected.iter().copied().collect();
    for node in infected {
        dynamics.recover(state, node)?;
    }
    dynamics.clear_scheduler();
    Ok(())
}

fn restore_from_history<D: Dynamics>(
    state: &mut EngineState,
    dynamics: &mut D,
) -> Result<(), HocsimError> {
    clear_state(state, dynamics)?;
    let index = state.rng.random_range(0..state.history.len());
    trace!(
        "process absorbed at t={}, restoring configuration {index} from history",
        state.current_time
    );
    let snapshot: Vec<Node> = state.history[index].iter().copied().collect();
    for node in snapshot {
        dynamics.infect(state, node)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashSetExt;
    use crate::network::Edge;
    use crate::process::ContinuousSis;

    fn one_group(size: usize) -> Vec<Edge> {
        (0..size).map(|node| (node, 0)).collect()
    }

    fn sis(size: usize) -> ContinuousSis {
        // each infected member recovers at rate 1; no infection
        ContinuousSis::new(
            &one_group(size),
            |_, infected| infected as f64,
            |_, _| 0.0,
            (1.0, 64.0),
        )
        .unwrap()
    }

    fn assert_consistent(engine: &ContinuousSis) {
        let state = engine.state();
        let infected_count = state
            .node_states()
            .iter()
            .filter(|&&node_state| node_state == NodeState::Infected)
            .count();
        assert_eq!(infected_count, state.number_of_infected_nodes());
        for group in state.network().groups() {
            for &node in state.network().group_members(group) {
                let roster_count = [NodeState::Susceptible, NodeState::Infected]
                    .iter()
                    .filter(|&&list| state.rosters().members(group, list).contains(&node))
                    .count();
                assert_eq!(roster_count, 1, "node {node} in {roster_count} lists");
            }
            let infected_in_group = state
                .network()
                .group_members(group)
                .iter()
                .filter(|&&node| state.node_states()[node] == NodeState::Infected)
                .count();
            assert_eq!(
                state.rosters().count(group, NodeState::Infected),
                infected_in_group
            );
        }
    }

    #[test]
    fn infect_fraction_counts() {
        let mut engine = sis(10);
        engine.seed(3);
        engine.infect_fraction(0.5).unwrap();
        assert_eq!(engine.number_of_infected_nodes(), 5);
        assert_consistent(&engine);
    }

    #[test]
    fn infect_fraction_zero_is_noop() {
        let mut engine = sis(10);
        engine.infect_fraction(0.0).unwrap();
        assert_eq!(engine.number_of_infected_nodes(), 0);
    }

    #[test]
    fn infect_fraction_rejects_out_of_range() {
        let mut engine = sis(10);
        assert!(engine.infect_fraction(1.5).is_err());
        assert!(engine.infect_fraction(-0.1).is_err());
    }

    #[test]
    fn infect_node_set_skips_non_susceptible() {
        let mut engine = sis(10);
        let mut nodes = HashSet::new();
        nodes.extend([0usize, 1, 2]);
        engine.infect_node_set(&nodes).unwrap();
        // second application is a silent no-op
        engine.infect_node_set(&nodes).unwrap();
        assert_eq!(engine.number_of_infected_nodes(), 3);
        assert_consistent(&engine);
    }

    #[test]
    fn infect_node_set_rejects_unknown_node() {
        let mut engine = sis(10);
        let mut nodes = HashSet::new();
        nodes.insert(99usize);
        assert!(engine.infect_node_set(&nodes).is_err());
    }

    #[test]
    fn clear_recovers_everyone() {
        let mut engine = sis(10);
        engine.infect_fraction(1.0).unwrap();
        engine.clear().unwrap();
        assert_eq!(engine.number_of_infected_nodes(), 0);
        assert!(engine.lifetime().is_infinite());
        assert_consistent(&engine);
    }

    #[test]
    fn reset_zeroes_clocks_and_history() {
        let mut engine = sis(10);
        engine.infect_fraction(0.5).unwrap();
        engine.initialize_history(7);
        engine.evolve(5.0, EvolveOptions::default()).unwrap();
        engine.reset().unwrap();
        assert_eq!(engine.current_time(), 0.0);
        assert_eq!(engine.number_of_infected_nodes(), 0);
        assert!(engine.state().history.is_empty());
    }

    #[test]
    fn evolve_with_nobody_infected_only_advances_time() {
        let mut engine = sis(10);
        engine.evolve(100.0, EvolveOptions::default()).unwrap();
        assert_eq!(engine.current_time(), 100.0);
        assert_eq!(engine.number_of_infected_nodes(), 0);
        assert!(engine.lifetime().is_infinite());
    }

    #[test]
    fn evolve_rejects_bad_period() {
        let mut engine = sis(10);
        assert!(engine.evolve(-1.0, EvolveOptions::default()).is_err());
        assert!(engine
            .evolve(f64::INFINITY, EvolveOptions::default())
            .is_err());
    }

    #[test]
    fn pure_decay_absorbs_and_exits_early() {
        let mut engine = sis(10);
        engine.seed(11);
        engine.infect_fraction(1.0).unwrap();
        engine.evolve(1_000.0, EvolveOptions::default()).unwrap();
        assert_eq!(engine.number_of_infected_nodes(), 0);
        assert_eq!(engine.current_time(), 1_000.0);
        assert_consistent(&engine);
    }

    #[test]
    fn quasistationary_run_never_absorbs() {
        let mut engine = sis(10);
        engine.seed(4);
        engine.infect_fraction(1.0).unwrap();
        engine.initialize_history(50);
        let options = EvolveOptions {
            quasistationary: true,
            ..EvolveOptions::default()
        };
        for _ in 0..10 {
            engine.evolve(100.0, options).unwrap();
            assert!(engine.number_of_infected_nodes() > 0);
        }
        assert_eq!(engine.current_time(), 1_000.0);
        assert_consistent(&engine);
    }

    #[test]
    fn quasistationary_initializes_missing_history() {
        let mut engine = sis(10);
        engine.seed(5);
        engine.infect_fraction(0.3).unwrap();
        let options = EvolveOptions {
            quasistationary: true,
            ..EvolveOptions::default()
        };
        engine.evolve(10.0, options).unwrap();
        assert_eq!(engine.state().history.len(), DEFAULT_HISTORY_SIZE);
    }

    #[test]
    fn seeded_runs_replay_identically() {
        let run = || {
            let mut engine = sis(30);
            engine.seed(1234);
            engine.infect_fraction(0.5).unwrap();
            engine
                .evolve(
                    50.0,
                    EvolveOptions {
                        quasistationary: true,
                        ..EvolveOptions::default()
                    },
                )
                .unwrap();
            let mut infected: Vec<Node> = engine.infected_node_set().iter().copied().collect();
            infected.sort_unstable();
            infected
        };
        assert_eq!(run(), run());
    }
}
