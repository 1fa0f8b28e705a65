// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node-transmission likelihood term.
//!
//! Canonical variant: multinomial source selection, no mutation (closest to
//! the original source's `NoSuperInfectionNoMutation` model). A child's
//! latent genotype either arose transmitted from exactly one candidate
//! parent in its eligible-parent set (chosen uniformly, marginalized out by
//! summing), or arose from the background allele-frequency distribution as
//! a network-external ("source") case. Both branches are combined by
//! [`log_sum_exp`] so the result is the total log-probability across both
//! explanations, not a pick of the more likely one.
//!
//! Loss (partial non-transmission beyond the no-mutation subset rule) and
//! mutation kernels are noted here as extension points but not implemented.

use crate::genotype::Genotype;
use crate::graph::{Graph, NodeId};
use crate::infection::InfectionId;
use crate::numeric::log_sum_exp;
use crate::simplex::Simplex;
use crate::value::NodeValue;

/// `ln P(child | parent)` under independent per-allele Bernoulli
/// transmission with probability `p_transmit` and no mutation: every
/// allele present in `child` must also be present in `parent`, since a
/// transmitted allele can only be one the parent already carries.
#[must_use]
pub fn log_likelihood_given_parent(child: &Genotype, parent: &Genotype, p_transmit: f64) -> f64 {
    if !child.is_subset_of(parent) {
        return f64::NEG_INFINITY;
    }
    let mut log_p = 0.0;
    for i in 0..parent.num_alleles() {
        if parent.allele(i) {
            log_p += if child.allele(i) {
                p_transmit.ln()
            } else {
                (1.0 - p_transmit).ln()
            };
        }
    }
    log_p
}

/// `ln P(child)` under the network-external ("source") explanation: each
/// allele is present independently according to the population
/// allele-frequency simplex.
#[must_use]
pub fn source_log_likelihood(child: &Genotype, frequencies: &Simplex) -> f64 {
    let mut log_p = 0.0;
    for i in 0..child.num_alleles() {
        let freq = frequencies.frequency(i as usize);
        log_p += if child.allele(i) { freq.ln() } else { (1.0 - freq).ln() };
    }
    log_p
}

/// Combines the source explanation and every candidate-parent explanation
/// for `child`'s latent genotype into one total log-probability.
///
/// `candidate_parents` are `(parent_log_likelihood)` values already
/// computed against `child` via [`log_likelihood_given_parent`];
/// `log_prior_source` is `ln(pi_source)`, the prior log-probability the
/// infection is network-external, and `log_prior_per_parent` is
/// `ln((1 - pi_source) / |candidate_parents|)`, the prior log-probability of
/// any one specific candidate parent under the uniform multinomial-source
/// assumption. An empty candidate set collapses to the source explanation
/// alone (there is no network parent to marginalize over).
#[must_use]
pub fn combine(
    source_log_likelihood: f64,
    log_prior_source: f64,
    candidate_parents: &[f64],
    log_prior_per_parent: f64,
) -> f64 {
    if candidate_parents.is_empty() {
        return source_log_likelihood;
    }
    let mut terms = Vec::with_capacity(candidate_parents.len() + 1);
    terms.push(log_prior_source + source_log_likelihood);
    terms.extend(candidate_parents.iter().map(|ll| log_prior_per_parent + ll));
    log_sum_exp(&terms)
}

/// Registers the transmission-term computation node for one infection's
/// locus.
///
/// `parent_latents` maps every infection id that could ever appear in
/// `parent_set`'s value to the graph handle of its latent genotype at this
/// locus; it is captured once at registration time, matching the original
/// source's construction-time disallowed-parent capture.
///
/// The caller must also wire `graph.add_dependency` from `child_latent`,
/// `parent_set`, `frequencies`, `p_transmit`, `pi_source`, and every node in
/// `parent_latents` to the returned node.
#[allow(clippy::too_many_arguments)]
pub fn add_transmission_term(
    graph: &mut Graph,
    name: impl Into<Box<str>>,
    child_latent: NodeId,
    parent_set: NodeId,
    parent_latents: Vec<(InfectionId, NodeId)>,
    frequencies: NodeId,
    p_transmit: NodeId,
    pi_source: NodeId,
) -> NodeId {
    graph.add_computation(
        name,
        Box::new(move |g: &Graph, _id: NodeId| {
            let child = g.value(child_latent);
            let child = child.as_genotype();
            let frequencies_value = g.value(frequencies);
            let frequencies_value = frequencies_value.as_simplex();
            let p_transmit = g.value(p_transmit).as_scalar();
            let pi_source = g.value(pi_source).as_scalar();
            let parents = g.value(parent_set);
            let parents = parents.as_parent_set();

            let source_ll = source_log_likelihood(child, frequencies_value);
            let candidate_lls: Vec<f64> = parents
                .iter()
                .filter_map(|pid| parent_latents.iter().find(|(id, _)| id == pid))
                .map(|(_, node)| {
                    let parent_value = g.value(*node);
                    log_likelihood_given_parent(child, parent_value.as_genotype(), p_transmit)
                })
                .collect();

            let n = candidate_lls.len();
            let log_prior_per_parent = if n == 0 {
                f64::NEG_INFINITY
            } else {
                (1.0 - pi_source).ln() - (n as f64).ln()
            };
            let total = combine(source_ll, pi_source.ln(), &candidate_lls, log_prior_per_parent);
            NodeValue::Scalar(total)
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_child_has_finite_parent_likelihood() {
        let parent = Genotype::from_bitstring("1110");
        let child = Genotype::from_bitstring("1010");
        let ll = log_likelihood_given_parent(&child, &parent, 0.8);
        assert!(ll.is_finite());
    }

    #[test]
    fn non_subset_child_is_impossible_under_no_mutation() {
        let parent = Genotype::from_bitstring("1000");
        let child = Genotype::from_bitstring("0100");
        assert_eq!(log_likelihood_given_parent(&child, &parent, 0.8), f64::NEG_INFINITY);
    }

    #[test]
    fn combine_with_no_candidates_falls_back_to_source_only() {
        let got = combine(-2.0, (0.3_f64).ln(), &[], f64::NEG_INFINITY);
        assert_eq!(got, -2.0);
    }

    #[test]
    fn combine_is_at_least_as_large_as_its_largest_weighted_term() {
        let source_ll = -5.0;
        let log_prior_source = 0.1_f64.ln();
        let candidate_lls = [-1.0, -1.5];
        let log_prior_per_parent = (0.9_f64 / 2.0).ln();
        let total = combine(source_ll, log_prior_source, &candidate_lls, log_prior_per_parent);
        let best_weighted = (log_prior_source + source_ll)
            .max(log_prior_per_parent + candidate_lls[0])
            .max(log_prior_per_parent + candidate_lls[1]);
        assert!(total >= best_weighted - 1e-9);
        assert!(total.is_finite());
    }
}
