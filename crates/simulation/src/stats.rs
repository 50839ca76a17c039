//! Exact binomial hypothesis testing.

/// Exact two-sided binomial test.
///
/// Returns the probability, under `Binomial(trials, p)`, of observing an
/// outcome at most as likely as `hits`: the classic sum-of-point-masses
/// two-sided definition. Point masses are computed in log space from
/// cumulative log-factorials, so large trial counts stay stable.
///
/// Degenerate nulls are handled directly: `p = 0` demands zero hits and
/// `p = 1` demands all hits; any other observation has p-value 0.
pub fn binomial_test(hits: u64, trials: u64, p: f64) -> f64 {
    debug_assert!(hits <= trials, "hits cannot exceed trials");
    debug_assert!((0.0..=1.0).contains(&p), "p must be a probability");

    if trials == 0 {
        return 1.0;
    }
    if p <= 0.0 {
        return if hits == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if hits == trials { 1.0 } else { 0.0 };
    }

    let n = trials as usize;
    // ln_fact[k] = ln(k!)
    let mut ln_fact = vec![0.0f64; n + 1];
    for k in 1..=n {
        ln_fact[k] = ln_fact[k - 1] + (k as f64).ln();
    }

    let ln_p = p.ln();
    let ln_q = (1.0 - p).ln();
    let ln_pmf = |k: usize| {
        ln_fact[n] - ln_fact[k] - ln_fact[n - k] + k as f64 * ln_p + (n - k) as f64 * ln_q
    };

    // Small relative tolerance absorbs float noise when comparing point
    // masses that are mathematically equal.
    let cutoff = ln_pmf(hits as usize) + 1e-7;
    let total: f64 = (0..=n)
        .map(ln_pmf)
        .filter(|&mass| mass <= cutoff)
        .map(f64::exp)
        .sum();

    total.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_null_exact_values() {
        // P(X >= 7) + P(X <= 3) for Binomial(10, 0.5) = 2 * 176 / 1024.
        let expected = 352.0 / 1024.0;
        assert!((binomial_test(7, 10, 0.5) - expected).abs() < 1e-12);
        // Symmetry of the two-sided test.
        assert!((binomial_test(3, 10, 0.5) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_extreme_observation() {
        // Only k = 0 and k = 10 have mass <= pmf(10) under p = 0.5.
        let expected = 2.0 / 1024.0;
        assert!((binomial_test(10, 10, 0.5) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_modal_observation_has_unit_p_value() {
        assert_eq!(binomial_test(5, 10, 0.5), 1.0);
    }

    #[test]
    fn test_degenerate_nulls() {
        assert_eq!(binomial_test(0, 10, 0.0), 1.0);
        assert_eq!(binomial_test(1, 10, 0.0), 0.0);
        assert_eq!(binomial_test(10, 10, 1.0), 1.0);
        assert_eq!(binomial_test(9, 10, 1.0), 0.0);
        assert_eq!(binomial_test(0, 0, 0.5), 1.0);
    }

    #[test]
    fn test_asymmetric_null() {
        // Binomial(3, 0.25): pmf = [27, 27, 9, 1] / 64. Observing 2 keeps
        // masses <= 9/64: k = 2 and k = 3.
        let expected = 10.0 / 64.0;
        assert!((binomial_test(2, 3, 0.25) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_large_trial_count_is_stable() {
        // Observation right at the mean of Binomial(10000, 0.3).
        let p_value = binomial_test(3000, 10_000, 0.3);
        assert!(p_value > 0.9, "modal observation should not be rejected");

        // A far-out observation is decisively rejected.
        let p_value = binomial_test(2500, 10_000, 0.3);
        assert!(p_value < 1e-20);
    }

    #[test]
    fn test_calibrated_observation_is_not_rejected() {
        // 700 hits out of 1000 trials against p = 0.7.
        let p_value = binomial_test(700, 1000, 0.7);
        assert!(p_value > 0.9);
    }
}
