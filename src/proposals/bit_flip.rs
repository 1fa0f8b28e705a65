// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-bit allele-flip proposal.
//!
//! Grounded on `RandomAllelesBitSetSampler`: one allele of a
//! [`crate::genotype::Genotype`] is flipped uniformly at random, redrawing
//! if the flip would leave the genotype with zero alleles or exceed a
//! configured maximum complexity of infection. The Metropolis–Hastings
//! correction is asymmetric exactly at the boundary where the proposal
//! touches a count of one allele, since "flip this allele back" and "flip
//! any of N alleles" are not equally likely proposals in each direction.

use rand::RngCore;

use crate::genotype::Genotype;
use crate::graph::{Graph, NodeId};
use crate::proposals::{KernelStats, ProposalKernel, ProposalState, StepOutcome};
use crate::value::NodeValue;

/// A Metropolis–Hastings kernel that flips one allele of a genotype
/// parameter, bounded to stay within `[1, max_coi]` present alleles.
pub struct BitFlip {
    name: Box<str>,
    target: NodeId,
    max_coi: u32,
    stats: KernelStats,
    state: ProposalState,
}

impl BitFlip {
    #[must_use]
    pub fn new(name: impl Into<Box<str>>, target: NodeId, max_coi: u32) -> Self {
        BitFlip {
            name: name.into(),
            target,
            max_coi,
            stats: KernelStats::default(),
            state: ProposalState::Idle,
        }
    }

    fn sample_proposal(&self, current: &Genotype, rng: &mut dyn RngCore) -> Genotype {
        sample_flip(current, self.max_coi, rng)
    }

    /// `ln(N) - ln(N - 1)` style correction exactly at the boundary where
    /// either the current or proposed genotype carries a single allele,
    /// since the number of *valid* single-bit flips differs between the
    /// two states there.
    fn log_mh_adjustment(current: &Genotype, proposed: &Genotype) -> f64 {
        bit_flip_mh_adjustment(current, proposed)
    }
}

/// Flips a uniformly-chosen allele of `current`, redrawing until the result
/// has between one and `max_coi` alleles present.
#[must_use]
pub(crate) fn sample_flip(current: &Genotype, max_coi: u32, rng: &mut dyn RngCore) -> Genotype {
    loop {
        let index = rng.next_u32() % current.num_alleles();
        let mut candidate = *current;
        candidate.flip(index);
        let count = candidate.total_positive_count();
        if count >= 1 && count <= max_coi {
            return candidate;
        }
    }
}

/// The boundary-aware Metropolis–Hastings correction shared by every
/// single-bit allele-flip proposal. Exposed so
/// [`crate::proposals::joint_genotype_time`] can combine it with a
/// duration-side correction in one joint proposal.
#[must_use]
pub(crate) fn bit_flip_mh_adjustment(current: &Genotype, proposed: &Genotype) -> f64 {
    let current_count = current.total_positive_count();
    let proposed_count = proposed.total_positive_count();
    let numerator = if proposed_count == 1 {
        -((current.num_alleles() - 1) as f64).ln()
    } else {
        -(current.num_alleles() as f64).ln()
    };
    let denominator = if current_count == 1 {
        -((proposed.num_alleles() - 1) as f64).ln()
    } else {
        -(proposed.num_alleles() as f64).ln()
    };
    numerator - denominator
}

impl ProposalKernel for BitFlip {
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

        let proposed = self.sample_proposal(&current_value, rng);
        graph.set_value(self.target, NodeValue::Genotype(proposed));

        let proposed_posterior = graph.value(posterior).as_scalar();
        let adjustment = Self::log_mh_adjustment(&current_value, &proposed);
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
    fn proposal_stays_within_coi_bounds() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("genotype", NodeValue::Genotype(Genotype::from_bitstring("1000")));
        let posterior = graph.add_leaf("posterior", NodeValue::Scalar(0.0));
        let mut kernel = BitFlip::new("flip", target, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        for _ in 0..30 {
            kernel.step(&graph, posterior, &mut rng);
            let count = graph.value(target).as_genotype().total_positive_count();
            assert!((1..=3).contains(&count));
        }
    }
}
