// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Metropolis–Hastings proposal kernels.
//!
//! Every kernel follows the same protocol: open a checkpoint, propose a new
//! value, evaluate the resulting log-posterior, and either accept (commit,
//! discard the checkpoint) or reject (restore from the checkpoint). The
//! [`ProposalState`] machine tracks where a kernel is in that cycle so a
//! caller can tell a completed step from one still in flight.
//!
//! Each kernel additionally tracks adaptive-variance bookkeeping
//! ([`AdaptiveVariance`]) and running accept/reject counts ([`KernelStats`]),
//! grounded on `RandomWalkMH`'s `variance_`/`acceptances_`/`rejections_`/
//! `total_updates_` fields.

pub mod bit_flip;
pub mod bounded_gaussian;
pub mod discrete_walk;
pub mod joint_genotype_time;
pub mod simplex_salt;
pub mod zanella;

use rand::RngCore;

use crate::graph::Graph;

/// Where a kernel is within one Metropolis–Hastings update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalState {
    Idle,
    Proposing,
    Accepted,
    Rejected,
}

/// Running accept/reject counters, used both to report an end-of-run
/// summary and to drive [`AdaptiveVariance::adapt`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelStats {
    acceptances: u64,
    rejections: u64,
}

impl KernelStats {
    #[must_use]
    pub fn total_updates(&self) -> u64 {
        self.acceptances + self.rejections
    }

    #[must_use]
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.total_updates();
        if total == 0 {
            0.0
        } else {
            self.acceptances as f64 / total as f64
        }
    }

    fn record(&mut self, accepted: bool) {
        if accepted {
            self.acceptances += 1;
        } else {
            self.rejections += 1;
        }
    }
}

/// Adaptive proposal-variance control, restricted by the caller to an
/// adaptation window (see [`crate::scheduler`]).
///
/// Follows `RandomWalkMH::adapt()` exactly: after each update, nudge the
/// variance toward whatever would have produced the target acceptance
/// rate, with a step size that shrinks as `1 / sqrt(total_updates + 1)` so
/// later updates perturb the variance less.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveVariance {
    variance: f64,
    min_variance: f64,
    max_variance: f64,
    target_acceptance_rate: f64,
}

impl AdaptiveVariance {
    #[must_use]
    pub fn new(initial_variance: f64, min_variance: f64, max_variance: f64, target_acceptance_rate: f64) -> Self {
        AdaptiveVariance {
            variance: initial_variance,
            min_variance,
            max_variance,
            target_acceptance_rate,
        }
    }

    #[must_use]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn adapt(&mut self, stats: &KernelStats) {
        let step = (stats.acceptance_rate() - self.target_acceptance_rate)
            / ((stats.total_updates() + 1) as f64).sqrt();
        self.variance = (self.variance + step).clamp(self.min_variance, self.max_variance);
    }
}

/// Adapts a `&mut dyn RngCore` trait object so it can be passed to
/// `rand_distr::Distribution::sample`, which requires a concrete `Rng`
/// bound that `dyn RngCore` alone doesn't satisfy.
pub(crate) struct DynRng<'a>(pub &'a mut dyn RngCore);

impl RngCore for DynRng<'_> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest);
    }
}

/// The outcome of one [`ProposalKernel::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Accepted,
    Rejected,
}

/// A single Metropolis–Hastings proposal kernel.
///
/// Implementors own their target node handle(s) and RNG-driven proposal
/// logic; `step` performs the full save→propose→evaluate→accept-or-restore
/// cycle against a shared [`Graph`]. Requires `Send` so a [`crate::scheduler::Scheduler`]
/// holding a fleet of these can be moved into a replica-exchange rung's
/// scoped worker thread.
pub trait ProposalKernel: Send {
    /// A short, stable name used in scheduler registration and logging.
    fn name(&self) -> &str;

    /// Runs one update, returning whether the proposal was accepted.
    fn step(&mut self, graph: &Graph, posterior: crate::graph::NodeId, rng: &mut dyn RngCore) -> StepOutcome;

    /// Current state in the IDLE→PROPOSING→ACCEPTED|REJECTED→IDLE cycle.
    fn state(&self) -> ProposalState;

    /// Running acceptance statistics.
    fn stats(&self) -> &KernelStats;

    /// Nudges the proposal variance toward the target acceptance rate.
    /// A no-op for kernels with no tunable variance (e.g. the single-bit
    /// flip kernel).
    fn adapt(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_variance_increases_when_acceptance_rate_is_too_high() {
        let mut av = AdaptiveVariance::new(1.0, 1e-6, 1e6, 0.23);
        let mut stats = KernelStats::default();
        for _ in 0..10 {
            stats.record(true);
        }
        let before = av.variance();
        av.adapt(&stats);
        assert!(av.variance() > before);
    }

    #[test]
    fn adaptive_variance_decreases_when_acceptance_rate_is_too_low() {
        let mut av = AdaptiveVariance::new(1.0, 1e-6, 1e6, 0.23);
        let mut stats = KernelStats::default();
        for _ in 0..10 {
            stats.record(false);
        }
        let before = av.variance();
        av.adapt(&stats);
        assert!(av.variance() < before);
    }

    #[test]
    fn adaptive_variance_stays_within_bounds() {
        let mut av = AdaptiveVariance::new(1.0, 0.5, 1.5, 0.23);
        let mut stats = KernelStats::default();
        for _ in 0..1000 {
            stats.record(true);
            av.adapt(&stats);
        }
        assert!(av.variance() <= 1.5);
    }
}
