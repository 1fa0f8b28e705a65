// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simplex SALT (stick-breaking, adaptively-scaled, logit-transform)
//! proposal.
//!
//! Grounded on `SimplexSampler`: one coordinate is chosen, perturbed in
//! logit space by a Gaussian step, and the simplex is rescaled to restore
//! the sum-to-one invariant via [`crate::simplex::Simplex::set`]. Each
//! coordinate keeps its own adaptive variance, mirroring `adapt(idx)`.

use rand::RngCore;
use rand_distr::{Distribution, Normal};

use crate::graph::{Graph, NodeId};
use crate::proposals::{AdaptiveVariance, DynRng, KernelStats, ProposalKernel, ProposalState, StepOutcome};
use crate::value::NodeValue;

/// A Metropolis–Hastings kernel that perturbs one coordinate of a simplex
/// at a time, cycling coordinates round-robin across successive steps.
pub struct SimplexSalt {
    name: Box<str>,
    target: NodeId,
    next_coordinate: usize,
    per_coordinate_variance: Vec<AdaptiveVariance>,
    stats: KernelStats,
    state: ProposalState,
}

impl SimplexSalt {
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, target: NodeId, num_coordinates: usize, initial_variance: f64) -> Self {
        SimplexSalt {
            name: name.into(),
            target,
            next_coordinate: 0,
            per_coordinate_variance: (0..num_coordinates)
                .map(|_| AdaptiveVariance::new(initial_variance, 1e-12, 1e6, 0.23))
                .collect(),
            stats: KernelStats::default(),
            state: ProposalState::Idle,
        }
    }

    fn sample_proposal(&self, current: f64, variance: f64, rng: &mut dyn RngCore) -> f64 {
        let normal = Normal::new(0.0, variance.sqrt()).expect("variance must be positive");
        let step = normal.sample(&mut DynRng(rng));
        let logit = (current / (1.0 - current)).ln();
        let exp_prop = (logit + step).exp();
        exp_prop / (exp_prop + 1.0)
    }

    fn log_mh_adjustment(current: f64, proposed: f64) -> f64 {
        proposed.ln() + (1.0 - proposed).ln() - current.ln() - (1.0 - current).ln()
    }
}

impl ProposalKernel for SimplexSalt {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, graph: &Graph, posterior: NodeId, rng: &mut dyn RngCore) -> StepOutcome {
        self.state = ProposalState::Proposing;
        let coordinate = self.next_coordinate;
        self.next_coordinate = (self.next_coordinate + 1) % self.per_coordinate_variance.len().max(1);

        let current_posterior = graph.value(posterior).as_scalar();
        let current_simplex = graph.value(self.target);
        let current_simplex = current_simplex.as_simplex().clone();
        let current_value = current_simplex.frequency(coordinate);

        let checkpoint = graph.begin_checkpoint();
        graph.save_state(self.target, checkpoint);

        let variance = self.per_coordinate_variance[coordinate].variance();
        let proposed_value = self.sample_proposal(current_value, variance, rng);

        let mut proposed_simplex = current_simplex;
        proposed_simplex.set(coordinate, proposed_value);
        graph.set_value(self.target, NodeValue::Simplex(proposed_simplex));

        let proposed_posterior = graph.value(posterior).as_scalar();
        let adjustment = Self::log_mh_adjustment(current_value, proposed_value);
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

    fn adapt(&mut self) {
        for variance in &mut self.per_coordinate_variance {
            variance.adapt(&self.stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplex::Simplex;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn accepted_proposal_keeps_simplex_normalized() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("freqs", NodeValue::Simplex(Simplex::uniform(4)));
        let posterior = graph.add_leaf("posterior", NodeValue::Scalar(0.0));
        let mut kernel = SimplexSalt::new("freqs_salt", target, 4, 0.05);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..20 {
            kernel.step(&graph, posterior, &mut rng);
            let v = graph.value(target);
            let sum: f64 = v.as_simplex().frequencies().iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }
}
