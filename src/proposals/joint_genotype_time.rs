// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Joint genotype/infection-time proposal.
//!
//! Grounded on `JointGeneticsTimeSampler`: an infection's duration and one
//! locus's genotype are perturbed together in a single Metropolis–Hastings
//! step, since the two are correlated through the transmission likelihood
//! (a later inferred infection time changes which parents are eligible,
//! which changes which genotypes are plausible). Reordering the infection
//! changes its eligible-parent set (maintained incrementally by
//! [`crate::computation::parent_set`]); the genotype sub-proposal is then
//! drawn conditional on that new parent set's realisability, not
//! independently: every candidate genotype must be a subset of the
//! bitwise-OR of the new parents' latent genotypes, since under the
//! no-mutation transmission model no allele can appear that none of the
//! permitted parents carry. The reverse move is weighted the same way
//! against the old parent set's OR mask, so the Metropolis–Hastings
//! correction has to account for how many genotypes each mask permits
//! rather than treating the two sub-proposals as independent.

use rand::RngCore;
use rand_distr::{Distribution, Normal};

use crate::genotype::Genotype;
use crate::graph::{Graph, NodeId};
use crate::infection::InfectionId;
use crate::numeric::{ln_choose, log_sum_exp};
use crate::ordering::Ordering;
use crate::proposals::bounded_gaussian::logit_mh_adjustment;
use crate::proposals::{AdaptiveVariance, DynRng, KernelStats, ProposalKernel, ProposalState, StepOutcome};
use crate::value::{NodeValue, ParentSet};

/// A Metropolis–Hastings kernel that jointly perturbs one infection's
/// duration and its latent genotype at one locus.
pub struct JointGenotypeTime {
    name: Box<str>,
    infection: InfectionId,
    observation_time: f64,
    duration_target: NodeId,
    duration_lower: f64,
    duration_upper: f64,
    genotype_target: NodeId,
    max_coi: u32,
    ordering_node: NodeId,
    parent_set_node: NodeId,
    parent_latents: Vec<(InfectionId, NodeId)>,
    variance: AdaptiveVariance,
    stats: KernelStats,
    state: ProposalState,
}

impl JointGenotypeTime {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<Box<str>>,
        infection: InfectionId,
        observation_time: f64,
        duration_target: NodeId,
        duration_lower: f64,
        duration_upper: f64,
        genotype_target: NodeId,
        max_coi: u32,
        ordering_node: NodeId,
        parent_set_node: NodeId,
        parent_latents: Vec<(InfectionId, NodeId)>,
        initial_variance: f64,
    ) -> Self {
        JointGenotypeTime {
            name: name.into(),
            infection,
            observation_time,
            duration_target,
            duration_lower,
            duration_upper,
            genotype_target,
            max_coi,
            ordering_node,
            parent_set_node,
            parent_latents,
            variance: AdaptiveVariance::new(initial_variance, 1e-6, 1e6, 0.23),
            stats: KernelStats::default(),
            state: ProposalState::Idle,
        }
    }

    fn sample_duration(&self, current: f64, rng: &mut dyn RngCore) -> f64 {
        let normal = Normal::new(0.0, self.variance.variance().sqrt()).expect("variance must be positive");
        let step = normal.sample(&mut DynRng(rng));
        let logit = ((current - self.duration_lower) / (self.duration_upper - current)).ln();
        let exp_prop = (logit + step).exp();
        (self.duration_upper * exp_prop + self.duration_lower) / (exp_prop + 1.0)
    }

    /// The bitwise union of every latent genotype held by a member of
    /// `parent_set`, i.e. the alleles a child of that parent set could
    /// carry under the no-mutation transmission model.
    ///
    /// An empty parent set has no transmission constraint at all (the
    /// child can only be explained as network-external), so it maps to the
    /// unconstrained, all-ones mask rather than the empty one.
    fn or_mask(&self, graph: &Graph, width: u32, parent_set: &ParentSet) -> Genotype {
        if parent_set.is_empty() {
            return Genotype::empty(width).complement();
        }
        let mut mask = Genotype::empty(width);
        for parent in parent_set {
            if let Some((_, node)) = self.parent_latents.iter().find(|(id, _)| id == parent) {
                mask = mask.union(graph.value(*node).as_genotype());
            }
        }
        mask
    }
}

/// Draws uniformly among the genotypes whose alleles lie entirely within
/// `mask` and whose allele count is within `[1, max_coi]`, by rejection
/// sampling: alleles outside the mask are always absent, alleles inside it
/// are flipped independently, and out-of-range draws are redrawn.
fn sample_masked_genotype(mask: &Genotype, max_coi: u32, rng: &mut dyn RngCore) -> Genotype {
    debug_assert!(mask.total_positive_count() > 0, "no realisable allele under an empty mask");
    loop {
        let mut candidate = Genotype::empty(mask.num_alleles());
        for index in 0..mask.num_alleles() {
            if mask.allele(index) && rng.next_u32() % 2 == 0 {
                candidate.set(index);
            }
        }
        let count = candidate.total_positive_count();
        if count >= 1 && count <= max_coi {
            return candidate;
        }
    }
}

/// `ln` of the number of genotypes an `mask_ones`-allele mask permits under
/// the `[1, max_coi]` count constraint, via an explicit log-sum-exp over
/// one term per allele count — the same enumerate-and-combine shape
/// [`crate::likelihood::transmission::combine`] uses to sum per-parent
/// transmission terms.
///
/// A mask with no realisable allele (`mask_ones == 0`) permits exactly one
/// outcome, the unchanged genotype, so it returns `ln(1) == 0.0` rather
/// than `-infinity`: there is no allele left to resample, not zero ways to
/// resample it.
fn log_realizable_subset_count(mask_ones: u32, max_coi: u32) -> f64 {
    if mask_ones == 0 {
        return 0.0;
    }
    let upper = mask_ones.min(max_coi);
    let terms: Vec<f64> = (1..=upper).map(|count| ln_choose(mask_ones, count)).collect();
    log_sum_exp(&terms)
}

impl ProposalKernel for JointGenotypeTime {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, graph: &Graph, posterior: NodeId, rng: &mut dyn RngCore) -> StepOutcome {
        self.state = ProposalState::Proposing;
        let current_posterior = graph.value(posterior).as_scalar();
        let current_duration = graph.value(self.duration_target).as_scalar();
        let current_genotype = graph.value(self.genotype_target);
        let current_genotype = *current_genotype.as_genotype();
        let width = current_genotype.num_alleles();

        let checkpoint = graph.begin_checkpoint();
        graph.save_state(self.duration_target, checkpoint);
        graph.save_state(self.genotype_target, checkpoint);
        // Also saves `parent_set_node`: it is a dependent of `ordering_node`
        // (the caller-wired edge required below), so save/restore/accept
        // already recurse into it dependents-first.
        graph.save_state(self.ordering_node, checkpoint);

        let old_parent_set = graph.value(self.parent_set_node).as_parent_set().clone();
        let old_mask = self.or_mask(graph, width, &old_parent_set);

        let proposed_duration = self.sample_duration(current_duration, rng);
        graph.set_value(self.duration_target, NodeValue::Scalar(proposed_duration));

        let ordering_value = graph.value(self.ordering_node);
        let mut ordering: Ordering = ordering_value.as_ordering().clone();
        let new_infection_time = self.observation_time - proposed_duration;
        ordering.update_time(self.infection, new_infection_time);
        graph.set_value(self.ordering_node, NodeValue::Ordering(ordering));

        let new_parent_set = graph.value(self.parent_set_node).as_parent_set().clone();
        let new_mask = self.or_mask(graph, width, &new_parent_set);
        let new_mask_ones = new_mask.total_positive_count();
        let proposed_genotype = if new_mask_ones == 0 {
            current_genotype
        } else {
            sample_masked_genotype(&new_mask, self.max_coi, rng)
        };
        graph.set_value(self.genotype_target, NodeValue::Genotype(proposed_genotype));

        let proposed_posterior = graph.value(posterior).as_scalar();
        let genotype_adjustment =
            log_realizable_subset_count(new_mask_ones, self.max_coi) - log_realizable_subset_count(old_mask.total_positive_count(), self.max_coi);
        let adjustment =
            logit_mh_adjustment(self.duration_lower, self.duration_upper, current_duration, proposed_duration) + genotype_adjustment;
        let log_acceptance_ratio = proposed_posterior - current_posterior + adjustment;

        let u: f64 = (rng.next_u64() as f64) / (u64::MAX as f64);
        let accept = u.ln() <= log_acceptance_ratio;

        if accept {
            graph.accept_state(self.duration_target, checkpoint);
            graph.accept_state(self.genotype_target, checkpoint);
            graph.accept_state(self.ordering_node, checkpoint);
        } else {
            graph.restore_state(self.duration_target, checkpoint);
            graph.restore_state(self.genotype_target, checkpoint);
            graph.restore_state(self.ordering_node, checkpoint);
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
