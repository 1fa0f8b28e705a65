// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Locally-informed (Zanella-style) allele-flip proposal.
//!
//! Rather than choosing a bit to flip uniformly and correcting for the
//! asymmetry after the fact (as [`crate::proposals::bit_flip`] does), this
//! kernel evaluates every single-bit-flip neighbor's posterior *before*
//! choosing one, and samples proportionally to a balancing function of the
//! posterior ratio — `g(t) = sqrt(t)` here, the choice Zanella (2020) shows
//! satisfies detailed balance for any non-negative, skew-symmetric-ratio
//! balancing function. Because the proposal is already informed by the
//! target, the resulting correction is just the reverse/forward
//! normalizing-constant ratio rather than a count-based boundary term.

use rand::RngCore;

use crate::genotype::Genotype;
use crate::graph::{Graph, NodeId};
use crate::proposals::{KernelStats, ProposalKernel, ProposalState, StepOutcome};
use crate::value::NodeValue;

/// A locally-informed Metropolis–Hastings kernel over a genotype's
/// single-bit-flip neighborhood.
pub struct ZanellaInformed {
    name: Box<str>,
    target: NodeId,
    stats: KernelStats,
    state: ProposalState,
}

impl ZanellaInformed {
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, target: NodeId) -> Self {
        ZanellaInformed {
            name: name.into(),
            target,
            stats: KernelStats::default(),
            state: ProposalState::Idle,
        }
    }

    /// `g(t) = sqrt(t)`, Zanella's balancing function.
    fn balancing(log_ratio: f64) -> f64 {
        (0.5 * log_ratio).exp()
    }
}

impl ProposalKernel for ZanellaInformed {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, graph: &Graph, posterior: NodeId, rng: &mut dyn RngCore) -> StepOutcome {
        self.state = ProposalState::Proposing;
        let current_posterior = graph.value(posterior).as_scalar();
        let current_value = graph.value(self.target);
        let current_value = *current_value.as_genotype();

        let checkpoint = graph.begin_checkpoint();
        graph.save_state(self.target, checkpoint);

        let neighbors: Vec<(u32, Genotype)> = (0..current_value.num_alleles())
            .map(|i| {
                let mut candidate = current_value;
                candidate.flip(i);
                (i, candidate)
            })
            .collect();

        let weights: Vec<f64> = neighbors
            .iter()
            .map(|(_, candidate)| {
                graph.set_value(self.target, NodeValue::Genotype(*candidate));
                let candidate_posterior = graph.value(posterior).as_scalar();
                Self::balancing(candidate_posterior - current_posterior)
            })
            .collect();
        graph.set_value(self.target, NodeValue::Genotype(current_value));

        let total_weight: f64 = weights.iter().sum();
        let chosen = if total_weight <= 0.0 || !total_weight.is_finite() {
            0
        } else {
            let threshold = (rng.next_u64() as f64 / u64::MAX as f64) * total_weight;
            let mut cumulative = 0.0;
            let mut chosen = weights.len() - 1;
            for (index, weight) in weights.iter().enumerate() {
                cumulative += weight;
                if cumulative >= threshold {
                    chosen = index;
                    break;
                }
            }
            chosen
        };

        let proposed = neighbors[chosen].1;
        graph.set_value(self.target, NodeValue::Genotype(proposed));
        let proposed_posterior = graph.value(posterior).as_scalar();

        // Reverse-move normalizing constant: the sum of balancing weights
        // over the proposed genotype's own single-bit-flip neighborhood,
        // which always includes a flip back to `current_value`.
        let reverse_total_weight: f64 = (0..proposed.num_alleles())
            .map(|i| {
                let mut candidate = proposed;
                candidate.flip(i);
                graph.set_value(self.target, NodeValue::Genotype(candidate));
                let candidate_posterior = graph.value(posterior).as_scalar();
                Self::balancing(candidate_posterior - proposed_posterior)
            })
            .sum();
        graph.set_value(self.target, NodeValue::Genotype(proposed));

        let log_acceptance_ratio = if total_weight <= 0.0 || reverse_total_weight <= 0.0 {
            f64::NEG_INFINITY
        } else {
            total_weight.ln() - reverse_total_weight.ln()
        };

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
    fn step_always_leaves_a_valid_genotype_of_the_same_width() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("genotype", NodeValue::Genotype(Genotype::from_bitstring("1010")));
        let posterior = graph.add_leaf("posterior", NodeValue::Scalar(0.0));
        let mut kernel = ZanellaInformed::new("zanella", target);
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..15 {
            kernel.step(&graph, posterior, &mut rng);
            assert_eq!(graph.value(target).as_genotype().num_alleles(), 4);
        }
    }
}
