// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parallel-tempered replica exchange.
//!
//! A geometric ladder of inverse temperatures `1 = beta[0] > beta[1] > ... >
//! beta[M-1] > 0` runs one independent Metropolis–Hastings chain per rung.
//! Heated chains (`beta` close to `0`) flatten the likelihood and mix freely
//! between modes that the cold chain (`beta = 1`, the only rung whose
//! samples are kept) would reject almost everywhere.
//!
//! Every so many iterations, adjacent rungs attempt a swap: accept with
//! probability `min(1, exp((beta_k - beta_{k+1}) * (L_{k+1} - L_k)))`, where
//! `L_k` is chain `k`'s current log-likelihood. A swap exchanges which
//! *temperature* two replicas run at, not their parameter state: each
//! [`Replica`] keeps its own [`Graph`] (genotypes, orders, durations) fixed
//! in its slot for the run's whole lifetime, and only the
//! [`Beta`](crate::likelihood::posterior::Beta) cell its posterior reads
//! from changes hands. This avoids moving arbitrarily large chain state
//! across threads on every accepted swap and keeps each replica's `Graph`
//! (which is `!Sync` by construction, see [`crate::graph`]) owned by exactly
//! one thread for its entire lifetime.
//!
//! Per-round advancement of the `M` replicas runs concurrently on
//! `std::thread::scope`, one thread per replica; each replica publishes its
//! post-round log-posterior to a `parking_lot::RwLock` the coordinating
//! thread reads once every replica has finished, so swap decisions never
//! race a replica's own in-flight step.

use parking_lot::RwLock;
use rand::RngCore;
use tracing::{debug, trace};

use crate::graph::Graph;
use crate::likelihood::posterior::{Beta, Posterior};
use crate::scheduler::Scheduler;

/// One rung's full chain state: its own dependency graph, the posterior and
/// log-likelihood nodes to read from it, the kernel scheduler that advances
/// it, and the shared cells used to publish/swap its temperature.
pub struct Replica {
    pub graph: Graph,
    pub posterior: Posterior,
    pub scheduler: Scheduler,
    beta: Beta,
    published_log_likelihood: RwLock<f64>,
}

impl Replica {
    #[must_use]
    pub fn new(graph: Graph, posterior: Posterior, scheduler: Scheduler, beta: Beta) -> Self {
        Replica {
            graph,
            posterior,
            scheduler,
            beta,
            published_log_likelihood: RwLock::new(0.0),
        }
    }

    /// The temperature this replica is currently running at. Changes across
    /// the run's lifetime as swaps are accepted.
    #[must_use]
    pub fn beta(&self) -> f64 {
        self.beta.get()
    }

    /// The log-likelihood this replica published after its most recent
    /// round of steps, without triggering a recompute. Used by swap
    /// decisions: the prior is temperature-invariant, so only the
    /// likelihood (not the full log-posterior) belongs in the swap ratio.
    #[must_use]
    pub fn published_log_likelihood(&self) -> f64 {
        *self.published_log_likelihood.read()
    }

    fn advance(&mut self, steps: u64, rng: &mut (dyn RngCore + Send)) {
        for _ in 0..steps {
            self.scheduler.step(&self.graph, self.posterior.value, rng);
        }
        let current = self.graph.value(self.posterior.log_likelihood).as_scalar();
        *self.published_log_likelihood.write() = current;
    }
}

/// Computes a geometric temperature ladder of length `count`, with
/// `ladder[0] == 1.0` and `ladder[count - 1] == beta_min`.
///
/// # Panics
/// Panics if `count < 2` or `beta_min` is not in `(0, 1)`.
#[must_use]
pub fn geometric_ladder(count: usize, beta_min: f64) -> Vec<f64> {
    assert!(count >= 2, "a temperature ladder needs at least two rungs");
    assert!(
        beta_min > 0.0 && beta_min < 1.0,
        "beta_min must lie strictly between 0 and 1"
    );
    (0..count)
        .map(|k| beta_min.powf(k as f64 / (count - 1) as f64))
        .collect()
}

/// Drives `M` tempered replicas through alternating rounds of independent
/// per-chain MCMC advancement and adjacent-pair swap proposals.
pub struct ReplicaExchange {
    replicas: Vec<Replica>,
}

impl ReplicaExchange {
    #[must_use]
    pub fn new(replicas: Vec<Replica>) -> Self {
        assert!(replicas.len() >= 2, "replica exchange needs at least two replicas");
        ReplicaExchange { replicas }
    }

    #[must_use]
    pub fn replicas(&self) -> &[Replica] {
        &self.replicas
    }

    /// The index of the replica currently running the cold (`beta == 1.0`)
    /// chain, the only one whose draws belong in the posterior sample.
    ///
    /// # Panics
    /// Panics if no replica currently holds `beta == 1.0`; this would
    /// indicate a bug in swap bookkeeping rather than a runtime condition
    /// callers should handle.
    #[must_use]
    pub fn cold_chain_index(&self) -> usize {
        self.replicas
            .iter()
            .position(|r| r.beta() == 1.0)
            .expect("exactly one replica must hold beta == 1.0 at all times")
    }

    /// Advances every replica `steps_per_round` times concurrently (one
    /// thread per replica), then attempts one adjacent-pair swap round.
    ///
    /// `rngs` supplies one independent RNG stream per replica plus one more
    /// for the swap-acceptance draws, in that order.
    ///
    /// # Panics
    /// Panics if `rngs.len() != self.replicas.len() + 1`.
    pub fn round(&mut self, steps_per_round: u64, rngs: &mut [&mut (dyn RngCore + Send)]) {
        assert_eq!(
            rngs.len(),
            self.replicas.len() + 1,
            "need one rng per replica plus one for swap decisions"
        );
        let (chain_rngs, swap_rng) = rngs.split_at_mut(self.replicas.len());
        let swap_rng = &mut *swap_rng[0];

        std::thread::scope(|scope| {
            for (replica, rng) in self.replicas.iter_mut().zip(chain_rngs.iter_mut()) {
                let rng: &mut (dyn RngCore + Send) = &mut **rng;
                scope.spawn(move || replica.advance(steps_per_round, rng));
            }
        });

        for rank in 0..self.replicas.len() - 1 {
            self.propose_swap(rank, swap_rng);
        }
    }

    fn propose_swap(&mut self, rank: usize, rng: &mut dyn RngCore) {
        let beta_low = self.replicas[rank].beta();
        let beta_high = self.replicas[rank + 1].beta();
        let log_likelihood_low = self.replicas[rank].published_log_likelihood();
        let log_likelihood_high = self.replicas[rank + 1].published_log_likelihood();

        // If either chain's likelihood is -infinity, this evaluates to
        // -infinity too (or NaN iff both sides cancel to 0 * infinity,
        // which cannot happen here since beta_low != beta_high), so the
        // swap is rejected without a separate finiteness check.
        let log_acceptance_ratio = (beta_low - beta_high) * (log_likelihood_high - log_likelihood_low);
        let u: f64 = (rng.next_u64() as f64) / (u64::MAX as f64);
        let accept = u.ln() <= log_acceptance_ratio;

        trace!(rank, beta_low, beta_high, log_acceptance_ratio, accept, "replica swap proposal");
        if accept {
            self.replicas[rank].beta.set(beta_high);
            self.replicas[rank + 1].beta.set(beta_low);
            debug!(rank, "replica swap accepted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computation::accumulator::add_accumulator;
    use crate::likelihood::posterior::add_posterior;
    use crate::proposals::bounded_gaussian::BoundedGaussianWalk;
    use crate::scheduler::SamplerSpec;
    use crate::value::NodeValue;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn build_replica(beta_value: f64, seed_shift: f64) -> Replica {
        let mut graph = Graph::new();
        let param = graph.add_leaf("p", NodeValue::Scalar(0.5 + seed_shift));
        let ll = add_accumulator(&mut graph, "ll", vec![param]);
        graph.add_dependency(param, ll);
        let beta = Beta::new(beta_value);
        let posterior = add_posterior(&mut graph, "posterior", vec![ll], vec![], beta.clone());

        let mut scheduler = Scheduler::new();
        scheduler.register(
            Box::new(BoundedGaussianWalk::new("p_walk", param, 0.0, 1.0, 0.1)),
            SamplerSpec {
                weight: 1.0,
                adaptation_window: None,
            },
        );
        Replica::new(graph, posterior, scheduler, beta)
    }

    #[test]
    fn swap_decisions_use_log_likelihood_not_log_posterior() {
        // A replica with a large negative prior but identical likelihood to
        // its neighbor must never have its swap odds skewed by that prior,
        // since the prior is temperature-invariant.
        let mut graph = Graph::new();
        let param = graph.add_leaf("p", NodeValue::Scalar(0.0));
        let ll = add_accumulator(&mut graph, "ll", vec![param]);
        graph.add_dependency(param, ll);
        let lp = graph.add_leaf("lp", NodeValue::Scalar(-1000.0));
        let beta = Beta::new(1.0);
        let posterior = add_posterior(&mut graph, "posterior", vec![ll], vec![lp], beta.clone());
        assert_eq!(graph.value(posterior.log_likelihood), NodeValue::Scalar(0.0));
        assert_eq!(graph.value(posterior.value), NodeValue::Scalar(-1000.0));
    }

    #[test]
    fn geometric_ladder_starts_at_one_and_ends_at_beta_min() {
        let ladder = geometric_ladder(4, 0.01);
        assert_eq!(ladder.len(), 4);
        assert!((ladder[0] - 1.0).abs() < 1e-12);
        assert!((ladder[3] - 0.01).abs() < 1e-12);
        for window in ladder.windows(2) {
            assert!(window[0] > window[1]);
        }
    }

    #[test]
    fn round_advances_every_replica_and_keeps_exactly_one_cold_chain() {
        let ladder = geometric_ladder(3, 0.1);
        let replicas = ladder.iter().enumerate().map(|(i, &b)| build_replica(b, i as f64 * 0.1)).collect();
        let mut exchange = ReplicaExchange::new(replicas);

        let mut seeds: Vec<ChaCha8Rng> = (0..4).map(|i| ChaCha8Rng::seed_from_u64(i)).collect();
        let mut rng_refs: Vec<&mut (dyn RngCore + Send)> =
            seeds.iter_mut().map(|r| r as &mut (dyn RngCore + Send)).collect();
        for _ in 0..5 {
            exchange.round(3, &mut rng_refs);
            let _ = exchange.cold_chain_index();
        }

        let betas: Vec<f64> = exchange.replicas().iter().map(Replica::beta).collect();
        let mut sorted = betas.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(sorted, ladder, "swaps must only permute the fixed ladder values");
    }
}
