// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Prior log-densities.
//!
//! Grounded on `Prior<Distribution, TargetParam, ...>`: a prior is a
//! computation node over a single target parameter, re-evaluating its
//! log-pdf lazily when the target changes. A `NaN` pdf argument (the target
//! strayed outside the distribution's support during a proposal) maps to
//! `-infinity` rather than propagating as a domain error, so an
//! out-of-support proposal is simply rejected by the Metropolis–Hastings
//! acceptance test rather than crashing the sampler.

use crate::graph::{Graph, NodeId};
use crate::numeric::ln_beta;
use crate::value::NodeValue;

/// A prior distribution family over a scalar parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Beta { alpha: f64, beta: f64 },
    Gamma { shape: f64, scale: f64 },
}

impl Distribution {
    /// `ln(pdf(x))`, with any non-finite result (including an argument
    /// outside the distribution's support) mapped to `-infinity`.
    #[must_use]
    pub fn log_pdf(&self, x: f64) -> f64 {
        let raw = match *self {
            Distribution::Beta { alpha, beta } => {
                if !(0.0..=1.0).contains(&x) {
                    f64::NAN
                } else {
                    (alpha - 1.0) * x.ln() + (beta - 1.0) * (1.0 - x).ln() - ln_beta(alpha, beta)
                }
            }
            Distribution::Gamma { shape, scale } => {
                if x <= 0.0 {
                    f64::NAN
                } else {
                    (shape - 1.0) * x.ln() - x / scale - shape * scale.ln()
                        - crate::numeric::ln_gamma(shape)
                }
            }
        };
        if raw.is_nan() { f64::NEG_INFINITY } else { raw }
    }
}

/// Registers a prior computation node over `target`.
///
/// The caller must also call `graph.add_dependency(target, id)`.
pub fn add_prior(
    graph: &mut Graph,
    name: impl Into<Box<str>>,
    target: NodeId,
    distribution: Distribution,
) -> NodeId {
    graph.add_computation(
        name,
        Box::new(move |g: &Graph, _id: NodeId| {
            let x = g.value(target).as_scalar();
            NodeValue::Scalar(distribution.log_pdf(x))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beta_prior_rejects_out_of_support_proposal_as_negative_infinity() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("p", NodeValue::Scalar(0.5));
        let prior = add_prior(&mut graph, "p_prior", target, Distribution::Beta { alpha: 2.0, beta: 2.0 });
        graph.add_dependency(target, prior);
        assert!(graph.value(prior).as_scalar().is_finite());

        graph.set_value(target, NodeValue::Scalar(1.5));
        assert_eq!(graph.value(prior), NodeValue::Scalar(f64::NEG_INFINITY));
    }

    #[test]
    fn gamma_prior_is_finite_on_support() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("rate", NodeValue::Scalar(3.0));
        let prior = add_prior(&mut graph, "rate_prior", target, Distribution::Gamma { shape: 2.0, scale: 1.0 });
        graph.add_dependency(target, prior);
        assert!(graph.value(prior).as_scalar().is_finite());
    }

    #[test]
    fn gamma_prior_rejects_nonpositive_argument() {
        let d = Distribution::Gamma { shape: 2.0, scale: 1.0 };
        assert_eq!(d.log_pdf(-1.0), f64::NEG_INFINITY);
        assert_eq!(d.log_pdf(0.0), f64::NEG_INFINITY);
    }
}
