// Copyright 2026 the Transmission Graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small numerically-stable helpers shared by the likelihood and
//! computation modules.

/// Numerically stable `ln(sum(exp(x)))`, subtracting the running maximum
/// before summing so large-magnitude log terms don't silently underflow to
/// zero in the exponentiated domain.
///
/// An empty slice, or a slice whose maximum is `-infinity` (every term
/// vanished), returns `-infinity` rather than panicking: the numerical
/// underflow policy is to let `-infinity` flow through as a value, not to
/// treat it as an error.
#[must_use]
pub fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = terms.iter().map(|t| (t - max).exp()).sum();
    max + sum.ln()
}

/// `ln(n choose k)` via a running product of logs, avoiding factorial
/// overflow. Returns `-infinity` for `k > n`.
#[must_use]
pub fn ln_choose(n: u32, k: u32) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    let k = k.min(n - k);
    (1..=k).map(|i| ((n - k + i) as f64).ln() - (i as f64).ln()).sum()
}

/// `ln` of the binomial pmf `P(K = k)` for `K ~ Binomial(n, p)`.
///
/// Degenerate `p` (exactly `0.0` or `1.0`) is handled explicitly rather than
/// through `0.0_f64.ln()`, so the boundary returns a clean `-infinity`
/// instead of relying on IEEE `ln(0) == -inf` falling out of the general
/// formula (which it does, but the boundary is worth naming).
#[must_use]
pub fn log_binomial_pmf(k: u32, n: u32, p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if p == 1.0 {
        return if k == n { 0.0 } else { f64::NEG_INFINITY };
    }
    ln_choose(n, k) + k as f64 * p.ln() + (n - k) as f64 * (1.0 - p).ln()
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// The natural log of the gamma function, via the Lanczos approximation.
///
/// Used by the Beta and Gamma log-pdfs so prior evaluation never needs a
/// dependency purely for special functions. Accurate to within a few ULP
/// for the positive arguments priors use; not a general-purpose gamma
/// implementation (no reflection formula for negative arguments).
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula: Gamma(x) * Gamma(1-x) = pi / sin(pi x).
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut a = LANCZOS_COEFFICIENTS[0];
    let t = x + LANCZOS_G + 0.5;
    for (i, c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// `ln(Beta(a, b))` via `ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)`.
#[must_use]
pub fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sum_exp_matches_naive_computation_for_small_inputs() {
        let terms = [0.0_f64.ln(), 1.0_f64.ln(), 2.0_f64.ln()];
        let got = log_sum_exp(&terms);
        assert!((got.exp() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn log_sum_exp_of_all_negative_infinity_is_negative_infinity() {
        let terms = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        assert_eq!(log_sum_exp(&terms), f64::NEG_INFINITY);
    }

    #[test]
    fn log_sum_exp_empty_is_negative_infinity() {
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn binomial_pmf_sums_to_one_over_support() {
        let n = 6;
        let p = 0.3;
        let total: f64 = (0..=n).map(|k| log_binomial_pmf(k, n, p).exp()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn binomial_pmf_handles_degenerate_probabilities() {
        assert_eq!(log_binomial_pmf(0, 5, 0.0), 0.0);
        assert_eq!(log_binomial_pmf(3, 5, 0.0), f64::NEG_INFINITY);
        assert_eq!(log_binomial_pmf(5, 5, 1.0), 0.0);
        assert_eq!(log_binomial_pmf(2, 5, 1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn ln_gamma_matches_known_factorials() {
        assert!((ln_gamma(1.0) - 0.0).abs() < 1e-9);
        assert!((ln_gamma(2.0) - 0.0).abs() < 1e-9);
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-8);
    }

    #[test]
    fn ln_beta_is_symmetric() {
        assert!((ln_beta(2.0, 3.0) - ln_beta(3.0, 2.0)).abs() < 1e-9);
    }
}
