//! Stochastic simulation of contagion processes on higher-order networks
//!
//! `hocsim` simulates spreading processes in which transmission happens
//! within groups rather than over pairwise edges. A population of N nodes
//! is connected to M groups through a bipartite incidence; node states
//! evolve under parametric infection and recovery rules that may depend on
//! the group size and on the number of infected group members, so that
//! complex (non-linear) contagion is expressed naturally.
//!
//! The crate provides one event-driven engine and four process families on
//! top of it:
//! * [`ContinuousSis`](process::ContinuousSis) — continuous-time SIS where
//!   both recovery and infection are group-weighted events.
//! * [`GroupSis`](process::GroupSis) — continuous-time SIS with constant
//!   per-node recovery and a group infection kernel, including the
//!   power-law specialisation.
//! * [`ContinuousSir`](process::ContinuousSir) — continuous-time SIR with
//!   an absorbing recovered state and a kernel-matrix infection rate.
//! * [`DiscreteSis`](process::DiscreteSis) /
//!   [`HeterogeneousExposure`](process::HeterogeneousExposure) —
//!   discrete-time variants with Poisson-batched events, the latter driven
//!   by a random dose accumulated over a random participation time.
//!
//! Every variant shares the same lifecycle: build from an edge list, seed
//! initial infections, then [`evolve`](engine::Engine::evolve) over a
//! period while registered measurement hooks sample the state at
//! decorrelated instants. Quasi-stationary evolution keeps a process with
//! an absorbing state alive by replaying previously visited
//! configurations.
//!
//! ```rust
//! use hocsim::prelude::*;
//!
//! # fn main() -> Result<(), HocsimError> {
//! // 50 nodes, all sharing two groups
//! let mut edge_list = Vec::new();
//! for node in 0..50 {
//!     edge_list.push((node, 0));
//!     edge_list.push((node, 1));
//! }
//!
//! let mut process = GroupSis::powerlaw(&edge_list, 1.0, 0.05, 1.0, (0.5, 256.0))?;
//! process.seed(42);
//! process.infect_fraction(0.1)?;
//! process.initialize_history(50);
//! process.add_measure(Prevalence::new(process.size()));
//!
//! // burn-in, then evolve and measure in the quasi-stationary state
//! let options = EvolveOptions {
//!     quasistationary: true,
//!     ..EvolveOptions::default()
//! };
//! process.evolve(20.0, options)?;
//! process.evolve(
//!     20.0,
//!     EvolveOptions {
//!         measure: true,
//!         ..options
//!     },
//! )?;
//!
//! for measure in process.measures() {
//!     if let MeasureResult::Samples(samples) = measure.result() {
//!         println!("{}: {} samples", measure.name(), samples.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub use engine::{Dynamics, Engine, EngineState, Event, EvolveOptions};

pub mod error;
pub use error::HocsimError;

pub mod measure;
pub use measure::{
    InfectiousSet, MarginalInfectionProbability, Measure, MeasureResult, Prevalence, Time,
};

pub mod network;
pub use network::{BipartiteNetwork, Edge, Group, Node};

pub mod process;
pub use process::{
    discover_rate_envelope, ContinuousSir, ContinuousSis, DiscreteSis, GroupSis,
    HeterogeneousExposure, RateFunction,
};

pub mod roster;
pub use roster::{GroupRosters, NodeState};

pub mod sampling;
pub use sampling::SamplableSet;

pub mod log;
pub use crate::log::{
    debug, disable_logging, enable_logging, error, info, set_log_level, trace, warn, LevelFilter,
};

// Deterministic hashing data structures
mod hashing;
pub use crate::hashing::{HashMap, HashMapExt, HashSet, HashSetExt};

pub mod numeric;

mod macros;

// Preludes
pub mod prelude;
