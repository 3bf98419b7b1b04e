//! Statistical test engine.
//!
//! The p-value is a logistic stand-in for the true tail probability:
//! `1 / (1 + exp(0.717 * stat))`. It is monotonically decreasing in the
//! statistic and bounded in (0, 1), which is all the game needs.
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::constants::{
    CACHE_KEY_VALUE_WIDTH, DEFAULT_SIGNIFICANCE, INAPPROPRIATE_CHI_RANGE, INAPPROPRIATE_P_RANGE,
    INAPPROPRIATE_T_RANGE, LOGISTIC_P_SLOPE,
};
use crate::metrics::TestKind;
use crate::numbers::usize_to_f64;

/// Outcome of one test execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub p_value: f64,
    pub statistic: f64,
    /// `p_value < threshold`; always false for inappropriate tests.
    pub significant: bool,
    pub test_kind: TestKind,
    /// The test's data-type assumption did not match the samples.
    pub inappropriate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedOutcome {
    p_value: f64,
    statistic: f64,
    inappropriate: bool,
}

/// Runs t-tests and chi-square tests with a content-addressed result cache.
#[derive(Debug, Clone)]
pub struct TestEngine {
    rng: SmallRng,
    cache: HashMap<u64, CachedOutcome>,
}

impl TestEngine {
    #[must_use]
    pub fn new(rng: SmallRng) -> Self {
        Self {
            rng,
            cache: HashMap::new(),
        }
    }

    /// Run a test with the default 0.05 threshold.
    pub fn run_default(&mut self, kind: TestKind, sample_a: &[f64], sample_b: &[f64]) -> TestResult {
        self.run_test(kind, sample_a, sample_b, DEFAULT_SIGNIFICANCE)
    }

    /// Run a test; never fails, degenerate input yields "no evidence".
    pub fn run_test(
        &mut self,
        kind: TestKind,
        sample_a: &[f64],
        sample_b: &[f64],
        threshold: f64,
    ) -> TestResult {
        let key = content_key(kind, sample_a, sample_b);
        let outcome = if let Some(cached) = self.cache.get(&key) {
            log::debug!("test cache hit for {kind}");
            *cached
        } else {
            let outcome = self.compute(kind, sample_a, sample_b);
            self.cache.insert(key, outcome);
            outcome
        };

        let explanation = outcome.inappropriate.then(|| inappropriate_explanation(kind));
        TestResult {
            p_value: outcome.p_value,
            statistic: outcome.statistic,
            significant: !outcome.inappropriate && outcome.p_value < threshold,
            test_kind: kind,
            inappropriate: outcome.inappropriate,
            explanation,
        }
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn compute(&mut self, kind: TestKind, sample_a: &[f64], sample_b: &[f64]) -> CachedOutcome {
        if !is_appropriate(kind, sample_a, sample_b) {
            return self.inconclusive(kind);
        }
        let (p_value, statistic) = match kind {
            TestKind::TTest => welch_t_test(sample_a, sample_b),
            TestKind::ChiSquare => chi_square_test(sample_a, sample_b),
        };
        CachedOutcome {
            p_value,
            statistic,
            inappropriate: false,
        }
    }

    /// Plausible but never significant placeholder for a mismatched test.
    fn inconclusive(&mut self, kind: TestKind) -> CachedOutcome {
        let (p_lo, p_hi) = INAPPROPRIATE_P_RANGE;
        let (s_lo, s_hi) = match kind {
            TestKind::TTest => INAPPROPRIATE_T_RANGE,
            TestKind::ChiSquare => INAPPROPRIATE_CHI_RANGE,
        };
        let p_value = self.rng.gen_range(p_lo..p_hi).max(f64::EPSILON + p_lo);
        let statistic = self.rng.gen_range(s_lo..s_hi);
        CachedOutcome {
            p_value,
            statistic,
            inappropriate: true,
        }
    }
}

/// Every value is one of {0, 1, 2}.
#[must_use]
pub fn is_categorical_shaped(sample: &[f64]) -> bool {
    sample.iter().all(|v| [0.0, 1.0, 2.0].contains(v))
}

/// A t-test needs two numerical samples; a chi-square test needs two categorical ones.
#[must_use]
pub fn is_appropriate(kind: TestKind, sample_a: &[f64], sample_b: &[f64]) -> bool {
    let a = is_categorical_shaped(sample_a);
    let b = is_categorical_shaped(sample_b);
    match kind {
        TestKind::TTest => !a && !b,
        TestKind::ChiSquare => a && b,
    }
}

/// Logistic p-value approximation.
#[must_use]
pub fn logistic_p_value(statistic: f64) -> f64 {
    1.0 / (1.0 + (LOGISTIC_P_SLOPE * statistic.abs()).exp())
}

const NO_EVIDENCE: (f64, f64) = (1.0, 0.0);

fn mean_and_population_variance(sample: &[f64]) -> (f64, f64) {
    let n = usize_to_f64(sample.len());
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

/// Welch-style statistic with population standard deviations; returns `(p, t)`.
#[must_use]
pub fn welch_t_test(sample_a: &[f64], sample_b: &[f64]) -> (f64, f64) {
    if sample_a.len() < 2 || sample_b.len() < 2 {
        return NO_EVIDENCE;
    }
    let (mean_a, var_a) = mean_and_population_variance(sample_a);
    let (mean_b, var_b) = mean_and_population_variance(sample_b);
    if var_a == 0.0 && var_b == 0.0 {
        return NO_EVIDENCE;
    }
    let standard_error =
        (var_a / usize_to_f64(sample_a.len()) + var_b / usize_to_f64(sample_b.len())).sqrt();
    if standard_error == 0.0 || !standard_error.is_finite() {
        return NO_EVIDENCE;
    }
    let t = (mean_a - mean_b).abs() / standard_error;
    (logistic_p_value(t), t)
}

fn bucket_counts(sample: &[f64]) -> [f64; 3] {
    let mut counts = [0.0; 3];
    for value in sample {
        let index = crate::numbers::floor_f64_to_usize(*value).min(2);
        counts[index] += 1.0;
    }
    counts
}

/// 2x3 contingency chi-square over the buckets 0/1/2; returns `(p, chi2)`.
#[must_use]
pub fn chi_square_test(sample_a: &[f64], sample_b: &[f64]) -> (f64, f64) {
    if sample_a.is_empty() || sample_b.is_empty() {
        return NO_EVIDENCE;
    }
    let rows = [bucket_counts(sample_a), bucket_counts(sample_b)];
    let row_totals = rows.map(|row| row.iter().sum::<f64>());
    let grand_total: f64 = row_totals.iter().sum();
    let mut statistic = 0.0;
    for (row, row_total) in rows.iter().zip(row_totals) {
        for (column, observed) in row.iter().enumerate() {
            let column_total = rows[0][column] + rows[1][column];
            let expected = row_total * column_total / grand_total;
            if expected > 0.0 {
                statistic += (observed - expected).powi(2) / expected;
            }
        }
    }
    (logistic_p_value(statistic), statistic)
}

/// Cheap content hash over the truncated string form of every value.
fn content_key(kind: TestKind, sample_a: &[f64], sample_b: &[f64]) -> u64 {
    let mut text = String::with_capacity((sample_a.len() + sample_b.len()) * 6 + 16);
    text.push_str(kind.as_str());
    for sample in [sample_a, sample_b] {
        text.push('|');
        for value in sample {
            let mut rendered = value.to_string();
            rendered.truncate(CACHE_KEY_VALUE_WIDTH);
            text.push_str(&rendered);
            text.push(',');
        }
    }
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(text.as_bytes());
    hasher.finish()
}

fn inappropriate_explanation(kind: TestKind) -> String {
    match kind {
        TestKind::TTest => "A t-test compares means of numerical data, but at least one sample \
                            is categorical. The result below is not meaningful."
            .to_string(),
        TestKind::ChiSquare => "A chi-square test compares category frequencies, but at least \
                                one sample is numerical. The result below is not meaningful."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn engine() -> TestEngine {
        TestEngine::new(SmallRng::seed_from_u64(11))
    }

    #[test]
    fn zero_variance_t_test_reports_no_evidence() {
        let mut engine = engine();
        let result = engine.run_default(TestKind::TTest, &[3.5, 3.5, 3.5], &[3.5, 3.5, 3.5]);
        assert!((result.p_value - 1.0).abs() < f64::EPSILON);
        assert!(result.statistic.abs() < f64::EPSILON);
        assert!(!result.significant);
        assert!(!result.inappropriate);
    }

    #[test]
    fn too_small_samples_report_no_evidence() {
        assert_eq!(welch_t_test(&[1.5], &[2.5, 3.5]), (1.0, 0.0));
        assert_eq!(chi_square_test(&[], &[1.0]), (1.0, 0.0));
    }

    #[test]
    fn t_statistic_matches_hand_computation() {
        // means 2 and 5, population variances 2/3 each, n = 3
        let (p, t) = welch_t_test(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        let expected_t = 3.0 / (4.0_f64 / 9.0).sqrt();
        assert!((t - expected_t).abs() < 1e-9);
        assert!((p - logistic_p_value(expected_t)).abs() < 1e-12);
    }

    #[test]
    fn chi_square_matches_hand_computation() {
        let a = [0.0, 0.0, 1.0, 2.0];
        let b = [2.0, 2.0, 1.0, 0.0];
        // columns: 3, 2, 3 of 8; each row 4 -> expected 1.5, 1, 1.5
        let (_, chi) = chi_square_test(&a, &b);
        let expected = 4.0 * (0.25 / 1.5);
        assert!((chi - expected).abs() < 1e-9);
    }

    #[test]
    fn wrong_test_is_flagged_and_never_significant() {
        let mut engine = engine();
        let numerical = [1.25, -0.4, 2.75, 0.33, 1.9];
        let result = engine.run_default(TestKind::ChiSquare, &numerical, &numerical);
        assert!(result.inappropriate);
        assert!(!result.significant);
        assert!((0.07..0.15).contains(&result.p_value));
        assert!(result.explanation.is_some());

        let categorical = [0.0, 1.0, 1.0, 2.0];
        let result = engine.run_default(TestKind::TTest, &categorical, &numerical);
        assert!(result.inappropriate);
        assert!((0.4..1.6).contains(&result.statistic));
    }

    #[test]
    fn identical_inputs_hit_cache() {
        let mut engine = engine();
        let a = [1.0, 2.0, 3.5];
        let b = [0.5, 0.25, 0.75];
        let first = engine.run_default(TestKind::ChiSquare, &a, &b);
        let second = engine.run_default(TestKind::ChiSquare, &a, &b);
        assert_eq!(first, second);
        assert_eq!(engine.cached_len(), 1);

        let strict = engine.run_test(TestKind::TTest, &a, &b, 0.000_001);
        assert!(!strict.significant);
        assert_eq!(engine.cached_len(), 2);
        engine.clear_cache();
        assert_eq!(engine.cached_len(), 0);
    }

    #[test]
    fn content_key_uses_truncated_values() {
        let key = content_key(TestKind::TTest, &[1.234_567_8, 2.0], &[3.0]);
        assert_eq!(key, content_key(TestKind::TTest, &[1.234_567_89, 2.0], &[3.0]));
        assert_ne!(key, content_key(TestKind::ChiSquare, &[1.234_567_8, 2.0], &[3.0]));
        assert_ne!(key, content_key(TestKind::TTest, &[2.0, 1.234_567_8], &[3.0]));
        assert_ne!(key, content_key(TestKind::TTest, &[1.234_567_8], &[2.0, 3.0]));
    }

    #[test]
    fn p_value_decreases_with_statistic() {
        let mut previous = logistic_p_value(0.0);
        assert!((previous - 0.5).abs() < f64::EPSILON);
        for step in 1..20 {
            let p = logistic_p_value(f64::from(step) * 0.5);
            assert!(p < previous && p > 0.0);
            previous = p;
        }
    }

    #[test]
    fn appropriateness_follows_sample_shape() {
        assert!(is_categorical_shaped(&[0.0, 2.0, 1.0]));
        assert!(!is_categorical_shaped(&[0.0, 3.0]));
        assert!(is_appropriate(TestKind::TTest, &[0.5, 1.5], &[2.5, 3.0]));
        assert!(!is_appropriate(TestKind::TTest, &[0.0, 1.0], &[2.5, 3.0]));
        assert!(is_appropriate(TestKind::ChiSquare, &[0.0, 1.0], &[2.0, 1.0]));
    }
}
