//! Rule engine for metric selections and test choices.
use serde::{Deserialize, Serialize};

use crate::data::Catalog;
use crate::metrics::{MetricId, MetricType, TestKind, normalize_label};

/// Labels treated as numerical data.
pub const NUMERICAL_METRICS: [&str; 4] = [
    "Mean Return",
    "Volatility",
    "Average Daily Return",
    "Price Change",
];

/// Labels treated as categorical data.
pub const CATEGORICAL_METRICS: [&str; 3] =
    ["Positive Return Days", "Market Sentiment", "Up/Down Days"];

/// Verdict on a set of chosen metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsValidation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub metric_type: MetricType,
}

impl MetricsValidation {
    fn valid(metric_type: MetricType) -> Self {
        Self {
            is_valid: true,
            error_message: None,
            metric_type,
        }
    }

    fn invalid(metric_type: MetricType, message: &str) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.to_string()),
            metric_type,
        }
    }
}

/// Verdict on a test choice for a metric type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestValidation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Classify one label through the fixed membership lists.
#[must_use]
pub fn metric_type_of(label: &str) -> MetricType {
    let label = label.trim();
    if NUMERICAL_METRICS.contains(&label) {
        MetricType::Numerical
    } else if CATEGORICAL_METRICS.contains(&label) {
        MetricType::Categorical
    } else {
        MetricType::Mixed
    }
}

/// Check that the chosen metrics can be compared by a single test.
#[must_use]
pub fn validate_metrics<S: AsRef<str>>(selected: &[S]) -> MetricsValidation {
    match selected {
        [] => MetricsValidation::invalid(
            MetricType::Mixed,
            "No metrics selected. Choose the metric you want to compare.",
        ),
        [only] => MetricsValidation::valid(metric_type_of(only.as_ref())),
        [first, second] => {
            let (first, second) = (first.as_ref().trim(), second.as_ref().trim());
            let (first_type, second_type) = (metric_type_of(first), metric_type_of(second));
            if first == second {
                MetricsValidation::valid(first_type)
            } else if first_type == second_type {
                MetricsValidation::invalid(
                    first_type,
                    "Use the same metric on both sides of the comparison.",
                )
            } else {
                MetricsValidation::invalid(
                    MetricType::Mixed,
                    "Don't mix categorical and numerical metrics in one test.",
                )
            }
        }
        _ => MetricsValidation::invalid(
            MetricType::Mixed,
            "Select at most two metrics for a comparison.",
        ),
    }
}

/// Check that a test suits the metric type.
#[must_use]
pub fn validate_test_for_metrics(kind: TestKind, metric_type: MetricType) -> TestValidation {
    let error_message = match (metric_type, kind) {
        (MetricType::Numerical, TestKind::TTest) | (MetricType::Categorical, TestKind::ChiSquare) => {
            None
        }
        (MetricType::Numerical, TestKind::ChiSquare) => Some(
            "Numerical metrics need a t-test; a chi-square test compares category counts.",
        ),
        (MetricType::Categorical, TestKind::TTest) => Some(
            "Categorical metrics need a chi-square test; a t-test compares means.",
        ),
        (MetricType::Mixed, _) => {
            Some("Mixed or unrecognized metrics cannot be compared with any test.")
        }
    };
    TestValidation {
        is_valid: error_message.is_none(),
        error_message: error_message.map(str::to_string),
    }
}

/// Check the chosen metrics against the metric a scenario's hypothesis asks about.
///
/// Labels are normalized before comparison, so "mean return" and
/// "Mean-Return" both match "Mean Return".
#[must_use]
pub fn validate_metrics_match_hypothesis<S: AsRef<str>>(
    catalog: &Catalog,
    selected: &[S],
    scenario_index: usize,
    hypothesis_index: usize,
) -> MetricsValidation {
    let Some(scenario) = catalog.scenario(scenario_index) else {
        return MetricsValidation::invalid(
            MetricType::Mixed,
            &format!("Unknown scenario index {scenario_index}."),
        );
    };
    let Some(hypothesis) = scenario.hypotheses.get(hypothesis_index) else {
        return MetricsValidation::invalid(
            MetricType::Mixed,
            &format!(
                "Unknown hypothesis index {hypothesis_index} for scenario '{}'.",
                scenario.title
            ),
        );
    };

    let canonical: Vec<String> = selected
        .iter()
        .map(|label| {
            MetricId::from_label(label.as_ref())
                .map_or_else(|| label.as_ref().trim().to_string(), |m| m.label().to_string())
        })
        .collect();
    let base = validate_metrics(&canonical);
    if !base.is_valid {
        return base;
    }

    let expected = normalize_label(&hypothesis.metric);
    let expected_id = MetricId::from_label(&hypothesis.metric);
    let matches = canonical.iter().all(|label| {
        normalize_label(label) == expected
            || (expected_id.is_some() && MetricId::from_label(label) == expected_id)
    });
    if !matches || base.metric_type != hypothesis.metric_type {
        return MetricsValidation::invalid(
            base.metric_type,
            &format!(
                "This hypothesis is about {} ({} data); your selection measures something else.",
                hypothesis.metric, hypothesis.metric_type
            ),
        );
    }
    base
}
