// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded discrete-stride random-walk proposal.
//!
//! Grounded on `ConstrainedDiscreteRandomWalk`: the stride direction is
//! chosen proportional to how much room is available on each side (fewer
//! steps available on the shrinking side biases the walk away from it),
//! and the stride length is uniform within whichever side was chosen,
//! capped at a maximum distance. The Metropolis–Hastings correction is the
//! ratio of the total reachable range at the current value to the total
//! reachable range at the proposed value.

use rand::RngCore;

use crate::graph::{Graph, NodeId};
use crate::proposals::{KernelStats, ProposalKernel, ProposalState, StepOutcome};
use crate::value::NodeValue;

/// A Metropolis–Hastings kernel that perturbs one bounded integer-valued
/// parameter by a capped random stride.
pub struct DiscreteBoundedWalk {
    name: Box<str>,
    target: NodeId,
    lower: i64,
    upper: i64,
    max_distance: i64,
    stats: KernelStats,
    state: ProposalState,
}

impl DiscreteBoundedWalk {
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, target: NodeId, lower: i64, upper: i64, max_distance: i64) -> Self {
        DiscreteBoundedWalk {
            name: name.into(),
            target,
            lower,
            upper,
            max_distance,
            stats: KernelStats::default(),
            state: ProposalState::Idle,
        }
    }

    fn uniform_u64(rng: &mut dyn RngCore, bound: u64) -> u64 {
        if bound == 0 {
            0
        } else {
            rng.next_u64() % bound
        }
    }

    fn range_at(&self, value: i64) -> (i64, i64) {
        let left = (value - self.lower).min(self.max_distance);
        let right = (self.upper - value).min(self.max_distance);
        (left, right)
    }

    fn sample_proposal(&self, current: i64, rng: &mut dyn RngCore) -> i64 {
        let (left_range, right_range) = self.range_at(current);
        let total = left_range + right_range;
        debug_assert!(total > 0, "discrete walk target has no room to move");
        let pick_right = Self::uniform_u64(rng, total as u64) < right_range as u64;
        if pick_right {
            let stride = 1 + Self::uniform_u64(rng, right_range as u64) as i64;
            current + stride
        } else {
            let stride = 1 + Self::uniform_u64(rng, left_range as u64) as i64;
            current - stride
        }
    }

    fn log_mh_adjustment(&self, current: i64, proposed: i64) -> f64 {
        let (cl, cr) = self.range_at(current);
        let (pl, pr) = self.range_at(proposed);
        ((cl + cr) as f64).ln() - ((pl + pr) as f64).ln()
    }
}

impl ProposalKernel for DiscreteBoundedWalk {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, graph: &Graph, posterior: NodeId, rng: &mut dyn RngCore) -> StepOutcome {
        self.state = ProposalState::Proposing;
        let current_posterior = graph.value(posterior).as_scalar();
        let current_value = graph.value(self.target).as_count();

        let checkpoint = graph.begin_checkpoint();
        graph.save_state(self.target, checkpoint);

        let proposed = self.sample_proposal(current_value, rng);
        graph.set_value(self.target, NodeValue::Count(proposed));

        let proposed_posterior = graph.value(posterior).as_scalar();
        let adjustment = self.log_mh_adjustment(current_value, proposed);
        let log_acceptance_ratio = proposed_posterior - current_posterior + adjustment;

        let u: f64 = (rng.next_u64() as f64) / (u64::MAX as f64);
        let accept = u.ln() <= log_acceptance_ratio;

        if accept {
            graph.accept_state(self.target, checkpoint);
        } else {
            graph.restore_state(self.target, checkpoint);
        }
        self.stats.record(accept);
        self.state = ProposalState::Idle;
        if accept {
            StepOutcome::Accepted
        } else {
            StepOutcome::Rejected
        }
    }

    fn state(&self) -> ProposalState {
        self.state
    }

    fn stats(&self) -> &KernelStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn proposal_stays_within_bounds_over_many_steps() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("coi", NodeValue::Count(1));
        let posterior = graph.add_leaf("posterior", NodeValue::Scalar(0.0));
        let mut kernel = DiscreteBoundedWalk::new("coi_walk", target, 1, 5, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            kernel.step(&graph, posterior, &mut rng);
            let v = graph.value(target).as_count();
            assert!((1..=5).contains(&v));
        }
    }
}
