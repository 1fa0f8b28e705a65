// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded Gaussian/logit random-walk proposal.
//!
//! Grounded on `ConstrainedRandomWalkMH`: the current value is mapped into
//! an unconstrained logit space, perturbed by a Gaussian step, and mapped
//! back into `[lower, upper]`. The Metropolis–Hastings correction accounts
//! for the non-linear logit transform's Jacobian.

use rand::RngCore;
use rand_distr::{Distribution, Normal};

use crate::graph::{Graph, NodeId};
use crate::proposals::{AdaptiveVariance, DynRng, KernelStats, ProposalKernel, ProposalState, StepOutcome};
use crate::value::NodeValue;

/// A Metropolis–Hastings kernel that perturbs one bounded scalar parameter
/// via a logit-space Gaussian random walk.
pub struct BoundedGaussianWalk {
    name: Box<str>,
    target: NodeId,
    lower: f64,
    upper: f64,
    variance: AdaptiveVariance,
    stats: KernelStats,
    state: ProposalState,
}

impl BoundedGaussianWalk {
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, target: NodeId, lower: f64, upper: f64, initial_variance: f64) -> Self {
        BoundedGaussianWalk {
            name: name.into(),
            target,
            lower,
            upper,
            variance: AdaptiveVariance::new(initial_variance, 1e-6, 1e6, 0.23),
            stats: KernelStats::default(),
            state: ProposalState::Idle,
        }
    }

    fn logit(&self, x: f64) -> f64 {
        ((x - self.lower) / (self.upper - x)).ln()
    }

    fn sample_proposal(&self, current: f64, rng: &mut dyn RngCore) -> f64 {
        let normal = Normal::new(0.0, self.variance.variance().sqrt()).expect("variance must be positive");
        let step = normal.sample(&mut DynRng(rng));
        let exp_prop = (self.logit(current) + step).exp();
        (self.upper * exp_prop + self.lower) / (exp_prop + 1.0)
    }

    fn log_mh_adjustment(&self, current: f64, proposed: f64) -> f64 {
        logit_mh_adjustment(self.lower, self.upper, current, proposed)
    }
}

/// The logit-transform Metropolis–Hastings correction shared by every
/// bounded-scalar random walk. Exposed so [`crate::proposals::joint_genotype_time`]
/// can combine it with a genotype-side correction in one joint proposal.
#[must_use]
pub(crate) fn logit_mh_adjustment(lower: f64, upper: f64, current: f64, proposed: f64) -> f64 {
    (proposed - lower).ln() + (upper - proposed).ln() - (current - lower).ln() - (upper - current).ln()
}

impl ProposalKernel for BoundedGaussianWalk {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, graph: &Graph, posterior: NodeId, rng: &mut dyn RngCore) -> StepOutcome {
        self.state = ProposalState::Proposing;
        let current_posterior = graph.value(posterior).as_scalar();
        let current_value = graph.value(self.target).as_scalar();

        let checkpoint = graph.begin_checkpoint();
        graph.save_state(self.target, checkpoint);

        let proposed = self.sample_proposal(current_value, rng);
        graph.set_value(self.target, NodeValue::Scalar(proposed));

        let proposed_posterior = graph.value(posterior).as_scalar();
        let adjustment = self.log_mh_adjustment(current_value, proposed);
        let log_acceptance_ratio = proposed_posterior - current_posterior + adjustment;

        let u: f64 = (rng.next_u64() as f64) / (u64::MAX as f64);
        let accept = u.ln() <= log_acceptance_ratio;

        if accept {
            graph.accept_state(self.target, checkpoint);
            self.state = ProposalState::Accepted;
        } else {
            graph.restore_state(self.target, checkpoint);
            self.state = ProposalState::Rejected;
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

    fn adapt(&mut self) {
        self.variance.adapt(&self.stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn accepted_proposal_leaves_target_within_bounds() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("p", NodeValue::Scalar(0.5));
        let posterior = graph.add_leaf("posterior", NodeValue::Scalar(0.0));
        let mut kernel = BoundedGaussianWalk::new("p_walk", target, 0.0, 1.0, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            kernel.step(&graph, posterior, &mut rng);
            let v = graph.value(target).as_scalar();
            assert!(v > 0.0 && v < 1.0);
        }
    }

    #[test]
    fn stats_total_matches_number_of_steps() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("p", NodeValue::Scalar(0.5));
        let posterior = graph.add_leaf("posterior", NodeValue::Scalar(0.0));
        let mut kernel = BoundedGaussianWalk::new("p_walk", target, 0.0, 1.0, 0.1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..15 {
            kernel.step(&graph, posterior, &mut rng);
        }
        assert_eq!(kernel.stats().total_updates(), 15);
    }
}
