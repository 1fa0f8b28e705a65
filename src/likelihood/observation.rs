// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-locus observation term: the probability of the observed
//! genotype call given the latent (true) genotype and the assay's
//! false-positive/false-negative rates.
//!
//! Each allele call is an independent Bernoulli trial: a present latent
//! allele is detected with probability `1 - false_negative_rate`, and an
//! absent latent allele is spuriously called present with probability
//! `false_positive_rate`. Summed in log space over the four confusion
//! categories ([`crate::genotype::Genotype`]'s true/false positive/negative
//! counts), this gives the per-infection, per-locus `L_obs` contribution.

use crate::genotype::Genotype;
use crate::graph::{Graph, NodeId};
use crate::value::NodeValue;

/// `ln P(observed | latent, false_positive_rate, false_negative_rate)`.
#[must_use]
pub fn log_likelihood(
    observed: &Genotype,
    latent: &Genotype,
    false_positive_rate: f64,
    false_negative_rate: f64,
) -> f64 {
    let tp = observed.true_positive_count(latent) as f64;
    let fp = observed.false_positive_count(latent) as f64;
    let fn_ = observed.false_negative_count(latent) as f64;
    let tn = observed.true_negative_count(latent) as f64;

    tp * (1.0 - false_negative_rate).ln()
        + fn_ * false_negative_rate.ln()
        + fp * false_positive_rate.ln()
        + tn * (1.0 - false_positive_rate).ln()
}

/// Registers the observation-term computation node for one infection's
/// locus.
///
/// The caller must also wire `graph.add_dependency` from `observed`,
/// `latent`, `false_positive_rate`, and `false_negative_rate` to the
/// returned node.
pub fn add_observation_term(
    graph: &mut Graph,
    name: impl Into<Box<str>>,
    observed: NodeId,
    latent: NodeId,
    false_positive_rate: NodeId,
    false_negative_rate: NodeId,
) -> NodeId {
    graph.add_computation(
        name,
        Box::new(move |g: &Graph, _id: NodeId| {
            let observed = g.value(observed);
            let latent = g.value(latent);
            let fp = g.value(false_positive_rate).as_scalar();
            let fn_ = g.value(false_negative_rate).as_scalar();
            NodeValue::Scalar(log_likelihood(
                observed.as_genotype(),
                latent.as_genotype(),
                fp,
                fn_,
            ))
        }),
    )
}
