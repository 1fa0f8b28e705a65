// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Weighted kernel scheduling.
//!
//! Grounded on `SampleScheduler`'s registration pattern: each proposal
//! kernel is registered once with a weight (relative selection frequency)
//! and an optional adaptation window, the iteration range during which its
//! proposal variance is tuned toward the target acceptance rate. Outside
//! that window the kernel still runs, it just stops adapting.

use rand::RngCore;
use tracing::{debug, trace};

use crate::graph::{Graph, NodeId};
use crate::proposals::ProposalKernel;

/// One kernel's scheduling metadata, mirroring `SampleScheduler`'s
/// `{sampler, id, adaptationStart, adaptationEnd, weight}` registration
/// struct literal.
pub struct SamplerSpec {
    /// Relative selection frequency; selection probability is
    /// `weight / sum(weights)`.
    pub weight: f64,
    /// The iteration range (inclusive start, exclusive end) during which
    /// this kernel's `adapt()` is called after each of its own steps.
    /// `None` means the kernel never adapts (e.g. the single-bit flip
    /// kernel has no tunable variance).
    pub adaptation_window: Option<(u64, u64)>,
}

struct Registration {
    kernel: Box<dyn ProposalKernel>,
    spec: SamplerSpec,
    cumulative_weight: f64,
}

/// Drives weighted-random selection among a fixed set of proposal kernels
/// for one MCMC chain.
pub struct Scheduler {
    registrations: Vec<Registration>,
    total_weight: f64,
    iteration: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Scheduler {
            registrations: Vec::new(),
            total_weight: 0.0,
            iteration: 0,
        }
    }

    /// Registers a kernel with its scheduling metadata.
    ///
    /// # Panics
    /// Panics if `spec.weight` is not strictly positive.
    pub fn register(&mut self, kernel: Box<dyn ProposalKernel>, spec: SamplerSpec) {
        assert!(spec.weight > 0.0, "sampler weight must be positive");
        self.total_weight += spec.weight;
        let cumulative_weight = self.total_weight;
        self.registrations.push(Registration {
            kernel,
            spec,
            cumulative_weight,
        });
    }

    /// The current iteration count, incremented once per [`Scheduler::step`].
    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Selects one kernel proportional to its weight (cumulative-weight
    /// binary search) and runs one Metropolis–Hastings update on it,
    /// adapting its variance if the current iteration falls within its
    /// adaptation window.
    ///
    /// # Panics
    /// Panics if no kernel has been registered.
    pub fn step(&mut self, graph: &Graph, posterior: NodeId, rng: &mut dyn RngCore) {
        assert!(!self.registrations.is_empty(), "no samplers registered");
        let threshold = (rng.next_u64() as f64 / u64::MAX as f64) * self.total_weight;
        let index = self
            .registrations
            .partition_point(|r| r.cumulative_weight < threshold)
            .min(self.registrations.len() - 1);

        let registration = &mut self.registrations[index];
        let outcome = registration.kernel.step(graph, posterior, rng);
        trace!(kernel = registration.kernel.name(), ?outcome, "proposal step");

        let in_window = registration
            .spec
            .adaptation_window
            .is_some_and(|(start, end)| self.iteration >= start && self.iteration < end);
        if in_window {
            registration.kernel.adapt();
        }
        self.iteration += 1;
    }

    /// An end-of-run summary of every registered kernel's acceptance rate,
    /// suitable for logging.
    pub fn summarize(&self) {
        for registration in &self.registrations {
            debug!(
                kernel = registration.kernel.name(),
                acceptance_rate = registration.kernel.stats().acceptance_rate(),
                total_updates = registration.kernel.stats().total_updates(),
                "sampler summary"
            );
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposals::bounded_gaussian::BoundedGaussianWalk;
    use crate::value::NodeValue;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn step_runs_without_panicking_and_advances_iteration() {
        let mut graph = Graph::new();
        let target = graph.add_leaf("p", NodeValue::Scalar(0.5));
        let posterior = graph.add_leaf("posterior", NodeValue::Scalar(0.0));
        let mut scheduler = Scheduler::new();
        scheduler.register(
            Box::new(BoundedGaussianWalk::new("p_walk", target, 0.0, 1.0, 0.1)),
            SamplerSpec {
                weight: 1.0,
                adaptation_window: Some((0, 10)),
            },
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..5 {
            scheduler.step(&graph, posterior, &mut rng);
        }
        assert_eq!(scheduler.iteration(), 5);
    }

    #[test]
    #[should_panic]
    fn register_rejects_nonpositive_weight() {
        let mut scheduler = Scheduler::new();
        let mut graph = Graph::new();
        let target = graph.add_leaf("p", NodeValue::Scalar(0.5));
        scheduler.register(
            Box::new(BoundedGaussianWalk::new("p_walk", target, 0.0, 1.0, 0.1)),
            SamplerSpec {
                weight: 0.0,
                adaptation_window: None,
            },
        );
    }
}
