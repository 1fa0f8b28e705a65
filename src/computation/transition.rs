// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The inter-transmission complexity-of-infection (COI) kernel.
//!
//! A source infection carrying `i` strains transmits each strain
//! independently with probability `p_transmit`; the number of strains a
//! child receives from one source is therefore `Binomial(i, p_transmit)`.
//! [`transmitted_strain_count_log_pmf`] marginalizes over the source's COI
//! distribution to give the log-probability that exactly `k` strains were
//! transmitted, `sum_i P(COI = i) * Binomial(k; i, p_transmit)`.

use crate::numeric::{log_binomial_pmf, log_sum_exp};

/// `ln P(K = k)` for the number of strains `K` transmitted from a source
/// whose COI follows `coi_log_pmf` (indexed by strain count, `coi_log_pmf[i]
/// = ln P(COI = i)`), given each strain transmits independently with
/// probability `p_transmit`.
#[must_use]
pub fn transmitted_strain_count_log_pmf(coi_log_pmf: &[f64], k: u32, p_transmit: f64) -> f64 {
    let terms: Vec<f64> = coi_log_pmf
        .iter()
        .enumerate()
        .filter(|(i, _)| *i as u32 >= k)
        .map(|(i, log_p_coi)| log_p_coi + log_binomial_pmf(k, i as u32, p_transmit))
        .collect();
    log_sum_exp(&terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marginal_pmf_sums_to_one_over_k() {
        let coi_log_pmf = [0.2_f64.ln(), 0.5_f64.ln(), 0.3_f64.ln()];
        let p = 0.6;
        let total: f64 = (0..=2)
            .map(|k| transmitted_strain_count_log_pmf(&coi_log_pmf, k, p).exp())
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_transmission_probability_forces_zero_strains() {
        let coi_log_pmf = [0.0_f64, 0.0_f64.ln()];
        let got = transmitted_strain_count_log_pmf(&[1.0_f64.ln()], 0, 0.0);
        assert_eq!(got, 0.0);
        let _ = coi_log_pmf;
    }
}
