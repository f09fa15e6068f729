//! Measurement hooks invoked by the evolve loop.
//!
//! A measurement hook is registered on an engine and invoked at each
//! measurement point of a measuring [`evolve`](crate::engine::Engine::evolve)
//! call, receiving a read-only view of the engine state. Hooks accumulate
//! across calls until [`clear`](Measure::clear) (or the engine's `reset`).

use crate::engine::EngineState;
use crate::hashing::HashSet;
use crate::network::Node;

/// The accumulated output of a measurement hook.
///
/// A tagged sum rather than per-hook result types: callers pattern-match on
/// the variant they registered.
#[derive(Debug, Clone)]
pub enum MeasureResult {
    /// One value per measurement point.
    Samples(Vec<f64>),
    /// One value per node.
    PerNode(Vec<f64>),
    /// One infected-set snapshot per measurement point.
    Snapshots(Vec<HashSet<Node>>),
}

/// A measurement accumulator. Implementations must not mutate engine state;
/// they only observe.
pub trait Measure {
    /// Records one observation of the current state.
    fn measure(&mut self, state: &EngineState);
    /// Discards everything accumulated so far.
    fn clear(&mut self);
    /// Stable identifier, e.g. `"prevalence"`.
    fn name(&self) -> &'static str;
    /// The accumulated result.
    fn result(&self) -> MeasureResult;
}

/// Fraction of infected nodes at each measurement point.
pub struct Prevalence {
    network_size: usize,
    samples: Vec<f64>,
}

impl Prevalence {
    pub fn new(network_size: usize) -> Self {
        Prevalence {
            network_size,
            samples: Vec::new(),
        }
    }
}

impl Measure for Prevalence {
    fn measure(&mut self, state: &EngineState) {
        self.samples
            .push(state.number_of_infected_nodes() as f64 / self.network_size as f64);
    }

    fn clear(&mut self) {
        self.samples.clear();
    }

    fn name(&self) -> &'static str {
        "prevalence"
    }

    fn result(&self) -> MeasureResult {
        MeasureResult::Samples(self.samples.clone())
    }
}

/// Empirical probability for each node of being infected at a measurement
/// point.
pub struct MarginalInfectionProbability {
    count: usize,
    weights: Vec<f64>,
}

impl MarginalInfectionProbability {
    pub fn new(network_size: usize) -> Self {
        MarginalInfectionProbability {
            count: 0,
            weights: vec![0.0; network_size],
        }
    }
}

impl Measure for MarginalInfectionProbability {
    fn measure(&mut self, state: &EngineState) {
        for &node in state.infected_node_set() {
            self.weights[node] += 1.0;
        }
        self.count += 1;
    }

    fn clear(&mut self) {
        self.count = 0;
        self.weights.fill(0.0);
    }

    fn name(&self) -> &'static str {
        "marginal_infection_probability"
    }

    fn result(&self) -> MeasureResult {
        let mut marginals = self.weights.clone();
        if self.count > 0 {
            for weight in &mut marginals {
                *weight /= self.count as f64;
            }
        }
        MeasureResult::PerNode(marginals)
    }
}

/// Snapshot of the infected set at each measurement point.
#[derive(Default)]
pub struct InfectiousSet {
    snapshots: Vec<HashSet<Node>>,
}

impl InfectiousSet {
    pub fn new() -> Self {
        InfectiousSet::default()
    }
}

impl Measure for InfectiousSet {
    fn measure(&mut self, state: &EngineState) {
        self.snapshots.push(state.infected_node_set().clone());
    }

    fn clear(&mut self) {
        self.snapshots.clear();
    }

    fn name(&self) -> &'static str {
        "infectious_set"
    }

    fn result(&self) -> MeasureResult {
        MeasureResult::Snapshots(self.snapshots.clone())
    }
}

/// Simulated-time stamp of each measurement point.
#[derive(Default)]
pub struct Time {
    samples: Vec<f64>,
}

impl Time {
    pub fn new() -> Self {
        Time::default()
    }
}

impl Measure for Time {
    fn measure(&mut self, state: &EngineState) {
        self.samples.push(state.current_time());
    }

    fn clear(&mut self) {
        self.samples.clear();
    }

    fn name(&self) -> &'static str {
        "time"
    }

    fn result(&self) -> MeasureResult {
        MeasureResult::Samples(self.samples.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashSetExt;
    use crate::process::ContinuousSis;

    fn engine_with_three_infected() -> ContinuousSis {
        let edges: Vec<(usize, usize)> = (0..10).map(|node| (node, 0)).collect();
        let mut engine = ContinuousSis::new(
            &edges,
            |_, infected| infected as f64,
            |_, _| 0.0,
            (1.0, 16.0),
        )
        .unwrap();
        let mut nodes = HashSet::new();
        nodes.extend([0usize, 1, 2]);
        engine.infect_node_set(&nodes).unwrap();
        engine
    }

    #[test]
    fn prevalence_records_fraction() {
        let engine = engine_with_three_infected();
        let mut prevalence = Prevalence::new(engine.size());
        prevalence.measure(engine.state());
        match prevalence.result() {
            MeasureResult::Samples(samples) => assert_eq!(samples, vec![0.3]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn marginal_probability_averages_over_measures() {
        let engine = engine_with_three_infected();
        let mut marginal = MarginalInfectionProbability::new(engine.size());
        marginal.measure(engine.state());
        marginal.measure(engine.state());
        match marginal.result() {
            MeasureResult::PerNode(marginals) => {
                assert_eq!(marginals[0], 1.0);
                assert_eq!(marginals[9], 0.0);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn infectious_set_snapshots_current_infected() {
        let engine = engine_with_three_infected();
        let mut snapshots = InfectiousSet::new();
        snapshots.measure(engine.state());
        match snapshots.result() {
            MeasureResult::Snapshots(sets) => {
                assert_eq!(sets.len(), 1);
                assert_eq!(sets[0].len(), 3);
                assert!(sets[0].contains(&1));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn clear_discards_accumulation() {
        let engine = engine_with_three_infected();
        let mut time = Time::new();
        time.measure(engine.state());
        time.clear();
        match time.result() {
            MeasureResult::Samples(samples) => assert!(samples.is_empty()),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
