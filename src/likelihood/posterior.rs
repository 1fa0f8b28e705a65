// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The top-level, temperature-scaled log-posterior.
//!
//! `value() = beta * log_likelihood + log_prior`: the inverse temperature
//! multiplies only the likelihood, never the prior, so a heated replica
//! still samples from a proper (flattened-likelihood) posterior rather than
//! an improper distribution with no prior mass at all.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::computation::accumulator::add_accumulator;
use crate::graph::{Graph, NodeId};
use crate::value::NodeValue;

/// A shared, atomically-swappable inverse temperature.
///
/// Replica exchange swaps which *physical* chain runs at which temperature
/// by exchanging the value held in two chains' `Beta` cells, not by moving
/// genotype/order/parameter state between chains (see
/// [`crate::replica_exchange`]). Stored as bit-cast `f64` in an `AtomicU64`
/// so the swap is lock-free and the cell is `Send + Sync` for cross-chain
/// concurrent stepping.
#[derive(Clone)]
pub struct Beta(Arc<AtomicU64>);

impl Beta {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Beta(Arc::new(AtomicU64::new(value.to_bits())))
    }

    #[must_use]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// The nodes a replica needs to hold onto after assembling its posterior:
/// the combined, temperature-scaled value a proposal kernel reads for its
/// acceptance test, and the unscaled log-likelihood accumulator replica
/// exchange reads for its swap test (the prior is temperature-invariant, so
/// swap decisions must use the likelihood alone, never the full
/// log-posterior — see `ReplicaExchange::propose_swap`).
#[derive(Debug, Clone, Copy)]
pub struct Posterior {
    pub value: NodeId,
    pub log_likelihood: NodeId,
}

/// Registers the log-posterior node for one replica at inverse temperature
/// `beta`.
pub fn add_posterior(
    graph: &mut Graph,
    name: impl Into<Box<str>>,
    log_likelihood_terms: Vec<NodeId>,
    log_prior_terms: Vec<NodeId>,
    beta: Beta,
) -> Posterior {
    let log_likelihood = add_accumulator(graph, "log_likelihood", log_likelihood_terms.clone());
    for term in &log_likelihood_terms {
        graph.add_dependency(*term, log_likelihood);
    }
    let log_prior = add_accumulator(graph, "log_prior", log_prior_terms.clone());
    for term in &log_prior_terms {
        graph.add_dependency(*term, log_prior);
    }

    let id = graph.add_computation(
        name,
        Box::new(move |g: &Graph, _id: NodeId| {
            let ll = g.value(log_likelihood).as_scalar();
            let lp = g.value(log_prior).as_scalar();
            NodeValue::Scalar(beta.get() * ll + lp)
        }),
    );
    graph.add_dependency(log_likelihood, id);
    graph.add_dependency(log_prior, id);
    Posterior { value: id, log_likelihood }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_chain_beta_one_equals_unscaled_sum() {
        let mut graph = Graph::new();
        let ll_term = graph.add_leaf("ll", NodeValue::Scalar(-4.0));
        let lp_term = graph.add_leaf("lp", NodeValue::Scalar(-1.0));
        let posterior = add_posterior(&mut graph, "posterior", vec![ll_term], vec![lp_term], Beta::new(1.0));
        assert_eq!(graph.value(posterior.value), NodeValue::Scalar(-5.0));
        assert_eq!(graph.value(posterior.log_likelihood), NodeValue::Scalar(-4.0));
    }

    #[test]
    fn heated_replica_scales_only_the_likelihood() {
        let mut graph = Graph::new();
        let ll_term = graph.add_leaf("ll", NodeValue::Scalar(-4.0));
        let lp_term = graph.add_leaf("lp", NodeValue::Scalar(-1.0));
        let posterior = add_posterior(&mut graph, "posterior", vec![ll_term], vec![lp_term], Beta::new(0.5));
        assert_eq!(graph.value(posterior.value), NodeValue::Scalar(-3.0));
        assert_eq!(graph.value(posterior.log_likelihood), NodeValue::Scalar(-4.0));
    }

    #[test]
    fn beta_can_be_swapped_after_construction() {
        let mut graph = Graph::new();
        let ll_term = graph.add_leaf("ll", NodeValue::Scalar(-4.0));
        let lp_term = graph.add_leaf("lp", NodeValue::Scalar(-1.0));
        let beta = Beta::new(1.0);
        let posterior = add_posterior(&mut graph, "posterior", vec![ll_term], vec![lp_term], beta.clone());
        assert_eq!(graph.value(posterior.value), NodeValue::Scalar(-5.0));
        beta.set(0.5);
        graph.set_value(ll_term, NodeValue::Scalar(-4.0));
        assert_eq!(graph.value(posterior.value), NodeValue::Scalar(-3.0));
    }
}
