// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The sampler-output logging seam.
//!
//! Real deployments write gzip-CSV traces per the §6 output layout (one
//! file per scalar parameter, per-locus allele-frequency traces, per-node
//! parent-set posteriors); building and flushing those files is a Non-goal
//! here. [`Logger`] is the trait a scheduler calls against so that concern
//! stays pluggable: [`NullLogger`] discards everything, and [`MemoryLogger`]
//! (test-only) keeps every logged value in memory for assertions. Any I/O
//! failure a concrete `Logger` performs (category 4 in the error taxonomy)
//! is the implementation's own responsibility; this trait has no `Result`
//! in its signature because the reactive graph itself never blocks on
//! logging.

/// A single named measurement taken at one sampler iteration.
///
/// Grounded on the output layout's per-file shape: a scalar trace logs one
/// [`Logger::log_scalar`] call per iteration, an allele-frequency or
/// genotype-bitset trace logs one [`Logger::log_vector`]/[`Logger::log_set`]
/// call, and `iteration` is the row index each line is keyed by.
pub trait Logger: Send {
    /// Logs one scalar value (a rate, a duration, a log-posterior) at
    /// `iteration`.
    fn log_scalar(&mut self, name: &str, iteration: u64, value: f64);

    /// Logs a fixed-length numeric vector (an allele-frequency simplex) at
    /// `iteration`.
    fn log_vector(&mut self, name: &str, iteration: u64, values: &[f64]);

    /// Logs a named set of string labels (a parent-set posterior support,
    /// the literal `{S}` exogenous-source token included) at `iteration`.
    fn log_set(&mut self, name: &str, iteration: u64, labels: &[String]);
}

/// A [`Logger`] that discards everything, used when no trace output is
/// wanted (dry runs, benchmarking the sampler in isolation).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log_scalar(&mut self, _name: &str, _iteration: u64, _value: f64) {}
    fn log_vector(&mut self, _name: &str, _iteration: u64, _values: &[f64]) {}
    fn log_set(&mut self, _name: &str, _iteration: u64, _labels: &[String]) {}
}

/// A logged scalar row, kept by [`MemoryLogger`] for test assertions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarRecord {
    pub iteration: u64,
    pub value: f64,
}

/// A [`Logger`] that accumulates every call in memory, keyed by name. Test
/// and example code only; no compression, buffering, or file I/O.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    scalars: Vec<(Box<str>, ScalarRecord)>,
    vectors: Vec<(Box<str>, u64, Vec<f64>)>,
    sets: Vec<(Box<str>, u64, Vec<String>)>,
}

impl MemoryLogger {
    #[must_use]
    pub fn new() -> Self {
        MemoryLogger::default()
    }

    /// Every scalar logged under `name`, in call order.
    #[must_use]
    pub fn scalars(&self, name: &str) -> Vec<ScalarRecord> {
        self.scalars
            .iter()
            .filter(|(n, _)| n.as_ref() == name)
            .map(|(_, record)| *record)
            .collect()
    }
}

impl Logger for MemoryLogger {
    fn log_scalar(&mut self, name: &str, iteration: u64, value: f64) {
        self.scalars.push((name.into(), ScalarRecord { iteration, value }));
    }

    fn log_vector(&mut self, name: &str, iteration: u64, values: &[f64]) {
        self.vectors.push((name.into(), iteration, values.to_vec()));
    }

    fn log_set(&mut self, name: &str, iteration: u64, labels: &[String]) {
        self.sets.push((name.into(), iteration, labels.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_logger_accepts_every_call_without_panicking() {
        let mut logger = NullLogger;
        logger.log_scalar("beta", 0, 0.5);
        logger.log_vector("freqs", 0, &[0.25, 0.75]);
        logger.log_set("parents", 0, &[String::from("a"), String::from("{S}")]);
    }

    #[test]
    fn memory_logger_retains_scalars_in_call_order() {
        let mut logger = MemoryLogger::new();
        logger.log_scalar("beta", 0, 0.5);
        logger.log_scalar("beta", 1, 0.6);
        logger.log_scalar("gamma", 0, 9.0);
        let beta = logger.scalars("beta");
        assert_eq!(beta, vec![ScalarRecord { iteration: 0, value: 0.5 }, ScalarRecord { iteration: 1, value: 0.6 }]);
    }
}
