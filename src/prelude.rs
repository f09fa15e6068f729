pub use crate::engine::{Engine, EngineState, Event, EvolveOptions};
pub use crate::error::HocsimError;
pub use crate::hashing::{HashMap, HashMapExt, HashSet, HashSetExt};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::measure::{
    InfectiousSet, MarginalInfectionProbability, Measure, MeasureResult, Prevalence, Time,
};
pub use crate::network::{BipartiteNetwork, Edge, Group, Node};
pub use crate::process::{
    ContinuousSir, ContinuousSis, DiscreteSis, GroupSis, HeterogeneousExposure,
};
pub use crate::roster::NodeState;
