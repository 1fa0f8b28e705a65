// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Run configuration.
//!
//! A plain, `serde`-derived struct tree rather than a full schema: this
//! crate's own surface (iteration counts, adaptation windows, ladder shape)
//! round-trips through JSON for reproducibility, but the domain input
//! document lives in [`crate::input`] and is validated separately.

use serde::{Deserialize, Serialize};

/// One proposal kernel's scheduling knobs, independent of which kernel it
/// names — the scheduler resolves `kernel` against its own registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// The kernel identifier, matching [`crate::proposals::ProposalKernel::name`].
    pub kernel: String,
    /// Relative selection frequency; see [`crate::scheduler::SamplerSpec::weight`].
    pub weight: f64,
    /// Iteration range during which this kernel's variance adapts.
    /// `None` disables adaptation entirely.
    #[serde(default)]
    pub adaptation_window: Option<(u64, u64)>,
    /// Starting proposal variance, for kernels that have one.
    #[serde(default = "default_initial_variance")]
    pub initial_variance: f64,
}

fn default_initial_variance() -> f64 {
    0.1
}

/// One chain's scheduler configuration: which kernels run and how often.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub kernels: Vec<KernelConfig>,
}

/// The replica-exchange ladder's shape and swap cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Number of rungs `M`, including the cold (`beta = 1`) chain.
    pub replica_count: usize,
    /// The hottest rung's inverse temperature, `beta[M - 1]`.
    pub beta_min: f64,
    /// MCMC steps each replica advances between swap rounds.
    pub steps_per_round: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            replica_count: 4,
            beta_min: 0.1,
            steps_per_round: 10,
        }
    }
}

/// Top-level run configuration: how many rounds to sample, the replica
/// ladder, and each chain's scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Total number of replica-exchange rounds to run.
    pub rounds: u64,
    /// Log every `log_every`-th round to the [`crate::logging::Logger`].
    #[serde(default = "default_log_every")]
    pub log_every: u64,
    pub exchange: ExchangeConfig,
    pub scheduler: SchedulerConfig,
    /// A fixed seed for the top-level RNG stream, for reproducible runs.
    #[serde(default)]
    pub seed: u64,
}

fn default_log_every() -> u64 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> RunConfig {
        RunConfig {
            rounds: 1000,
            log_every: 10,
            exchange: ExchangeConfig::default(),
            scheduler: SchedulerConfig {
                kernels: vec![KernelConfig {
                    kernel: String::from("bit_flip"),
                    weight: 1.0,
                    adaptation_window: None,
                    initial_variance: 0.1,
                }],
            },
            seed: 42,
        }
    }

    #[test]
    fn round_trips_through_json() {
        let config = sample_config();
        let text = serde_json::to_string(&config).unwrap();
        let parsed: RunConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn exchange_config_default_has_a_sane_ladder_shape() {
        let exchange = ExchangeConfig::default();
        assert!(exchange.replica_count >= 2);
        assert!(exchange.beta_min > 0.0 && exchange.beta_min < 1.0);
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let text = r#"{
            "rounds": 5,
            "exchange": { "replica_count": 2, "beta_min": 0.2, "steps_per_round": 1 },
            "scheduler": { "kernels": [] }
        }"#;
        let config: RunConfig = serde_json::from_str(text).unwrap();
        assert_eq!(config.log_every, 1);
        assert_eq!(config.seed, 0);
    }
}
