//! The contagion process variants, each a specialization of the shared
//! engine through its [`Dynamics`](crate::engine::Dynamics) implementation.

mod continuous_sir;
mod continuous_sis;
mod discrete_sis;
mod group_sis;
mod heterogeneous_exposure;

pub use continuous_sir::{ContinuousSir, ContinuousSirDynamics};
pub use continuous_sis::{ContinuousSis, ContinuousSisDynamics};
pub use discrete_sis::{DiscreteSis, DiscreteSisDynamics};
pub use group_sis::{GroupSis, GroupSisDynamics};
pub use heterogeneous_exposure::{HeterogeneousExposure, HeterogeneousExposureDynamics};

use crate::network::BipartiteNetwork;

/// A group-level rate kernel: maps (group size, infected members) to a
/// non-negative rate. Values must stay within the weight envelope the
/// process was constructed with.
pub type RateFunction = Box<dyn Fn(usize, usize) -> f64>;

/// Scans `rate` over every group size occurring in `network` and every
/// infected count reachable within such a group, returning the smallest and
/// largest positive values — a tight (wmin, wmax) envelope for a
/// [`ContinuousSis`] or [`GroupSis`] constructor. `None` when the kernel is
/// identically zero over the scanned domain.
pub fn discover_rate_envelope(
    network: &BipartiteNetwork,
    rate: impl Fn(usize, usize) -> f64,
) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = 0.0_f64;
    for size in network.min_group_size()..=network.max_group_size() {
        for infected in 0..=size {
            let value = rate(size, infected);
            if value > 0.0 {
                min = min.min(value);
                max = max.max(value);
            }
        }
    }
    (max > 0.0).then_some((min, max))
}
